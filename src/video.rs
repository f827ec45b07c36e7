//! Video assembly by handing a still sequence to an external encoder.

use std::env;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info, warn};
use thiserror::Error;

/// Default encoder binary, looked up on `PATH`.
pub const DEFAULT_ENCODER: &str = "ffmpeg";

/// Error type for video assembly.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// The encoder binary is not installed or not on `PATH`.
    #[error("encoder {0:?} not found; install ffmpeg ('apt install ffmpeg' or 'brew install ffmpeg')")]
    EncoderNotFound(String),
    /// The directory for the output file could not be created.
    #[error("cannot create video output directory {}: {source}", path.display())]
    OutputDir {
        /// Directory that was being created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The encoder could not be started.
    #[error("failed to run encoder: {0}")]
    Spawn(#[source] std::io::Error),
    /// The encoder ran and exited unsuccessfully.
    #[error("encoder failed with {}", describe_exit(.code))]
    EncoderFailed {
        /// Exit code, `None` if terminated by a signal.
        code: Option<i32>,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },
}

/// One video to build from a still sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeRequest {
    /// Directory holding the stills.
    pub image_folder: PathBuf,
    /// printf-style still name pattern, e.g. `image_%05d.jpg`.
    pub pattern: String,
    /// Video file to write (overwritten if present).
    pub output_path: PathBuf,
    /// Output frame rate.
    pub fps: NonZeroU32,
}

impl EncodeRequest {
    /// Input argument handed to the encoder: `{image_folder}/{pattern}`.
    #[must_use]
    pub fn input_pattern(&self) -> PathBuf {
        self.image_folder.join(&self.pattern)
    }
}

/// Streams captured from a successful encoder run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncoderOutput {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error (ffmpeg reports progress here).
    pub stderr: String,
}

/// Runs the external encoder.
#[derive(Debug, Clone)]
pub struct VideoAssembler {
    program: OsString,
}

impl Default for VideoAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoAssembler {
    /// Assembler using `ffmpeg` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_program(DEFAULT_ENCODER)
    }

    /// Assembler using another ffmpeg-compatible program. A value with a
    /// path separator is used as a path, anything else is searched on `PATH`.
    #[must_use]
    pub fn with_program<P: Into<OsString>>(program: P) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Full path of the encoder if it can be executed.
    #[must_use]
    pub fn locate(&self) -> Option<PathBuf> {
        find_program(&self.program)
    }

    /// Encoder arguments for `request`: H.264, yuv420p, CRF 23, preset
    /// medium, overwriting any existing output.
    #[must_use]
    pub fn arguments(request: &EncodeRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-y".into(),
            "-framerate".into(),
            request.fps.to_string().into(),
            "-i".into(),
            request.input_pattern().into_os_string(),
        ];
        args.extend(
            [
                "-c:v", "libx264", "-pix_fmt", "yuv420p", "-crf", "23", "-preset", "medium",
            ]
            .map(OsString::from),
        );
        args.push(request.output_path.clone().into_os_string());
        args
    }

    /// Encode the stills described by `request` into a video.
    ///
    /// Blocks until the encoder exits. There is no timeout. Success is an
    /// exit code of zero and nothing else.
    pub fn compile(&self, request: &EncodeRequest) -> Result<EncoderOutput, EncodingError> {
        let program = self.locate().ok_or_else(|| {
            EncodingError::EncoderNotFound(self.program.to_string_lossy().into_owned())
        })?;

        if let Some(parent) = request
            .output_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            fs::create_dir_all(parent).map_err(|source| EncodingError::OutputDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let args = Self::arguments(request);
        info!("Compiling video from {}", request.input_pattern().display());
        info!("  output: {}", request.output_path.display());
        info!("  framerate: {}", request.fps);
        debug!(
            "Running {} {}",
            program.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let output = Command::new(&program)
            .args(&args)
            .output()
            .map_err(EncodingError::Spawn)?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !stdout.is_empty() {
            debug!("encoder stdout:\n{stdout}");
        }
        if !stderr.is_empty() {
            debug!("encoder stderr:\n{stderr}");
        }

        if output.status.success() {
            info!(
                "Video compilation successful: {}",
                request.output_path.display()
            );
            Ok(EncoderOutput { stdout, stderr })
        } else {
            warn!("Encoder exited with {}", output.status);
            Err(EncodingError::EncoderFailed {
                code: output.status.code(),
                stdout,
                stderr,
            })
        }
    }
}

#[allow(clippy::ref_option)]
fn describe_exit(code: &Option<i32>) -> String {
    code.map_or_else(
        || "no exit code (killed by signal)".to_owned(),
        |c| format!("exit code {c}"),
    )
}

/// Compile only if the session produced stills.
///
/// Returns `None`, without looking for the encoder, when `captured` is zero.
pub fn compile_captured(
    assembler: &VideoAssembler,
    captured: u32,
    request: &EncodeRequest,
) -> Option<Result<EncoderOutput, EncodingError>> {
    if captured == 0 {
        info!("No images captured, skipping video compilation");
        return None;
    }
    Some(assembler.compile(request))
}

fn find_program(program: &OsStr) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|full| is_executable(full))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
