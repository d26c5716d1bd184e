use std::path::{Path, PathBuf};
use std::str::FromStr;

use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};
use sha2::{Digest, Sha256};
use tokio::fs;

use crate::error::PairingError;

/// QR error-correction level. Higher levels survive more damage but hold
/// less data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorCorrection {
    Low,
    Medium,
    Quartile,
    #[default]
    High,
}

impl ErrorCorrection {
    fn ec_level(self) -> EcLevel {
        match self {
            Self::Low => EcLevel::L,
            Self::Medium => EcLevel::M,
            Self::Quartile => EcLevel::Q,
            Self::High => EcLevel::H,
        }
    }
}

impl FromStr for ErrorCorrection {
    type Err = PairingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" => Ok(Self::Low),
            "M" => Ok(Self::Medium),
            "Q" => Ok(Self::Quartile),
            "H" => Ok(Self::High),
            _ => Err(PairingError::UnknownErrorCorrection(s.to_string())),
        }
    }
}

/// Where and how pairing codes are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOptions {
    pub output_dir: PathBuf,
    pub error_correction: ErrorCorrection,
    /// Minimum width and height of the rendered code in pixels.
    pub size_px: u32,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./qr-codes"),
            error_correction: ErrorCorrection::High,
            size_px: 300,
        }
    }
}

/// Render `payload` as an SVG QR code.
pub fn render_svg(payload: &str, options: &TransferOptions) -> Result<String, PairingError> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), options.error_correction.ec_level())
        .map_err(|e| PairingError::Encoding(format!("payload does not fit a QR code: {e}")))?;

    Ok(code
        .render::<svg::Color>()
        .min_dimensions(options.size_px, options.size_px)
        .quiet_zone(true)
        .build())
}

/// Write a rendered code into the output directory, creating it if needed.
pub async fn write_artifact(
    subject_id: &str,
    svg: &str,
    options: &TransferOptions,
) -> Result<PathBuf, PairingError> {
    fs::create_dir_all(&options.output_dir)
        .await
        .map_err(|e| unwritable(&options.output_dir, e))?;

    let path = options.output_dir.join(artifact_name(subject_id));
    fs::write(&path, svg).await.map_err(|e| unwritable(&path, e))?;
    Ok(path)
}

/// `qr_<subject>_<digest>.svg`. Anything outside `[A-Za-z0-9_-]` in the
/// subject is replaced so it can never escape the output directory; the
/// digest prefix of the raw subject keeps distinct subjects apart.
pub fn artifact_name(subject_id: &str) -> String {
    let safe: String = subject_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let digest = Sha256::digest(subject_id.as_bytes());
    format!("qr_{safe}_{}.svg", hex::encode(&digest[..8]))
}

fn unwritable(path: &Path, e: std::io::Error) -> PairingError {
    PairingError::Encoding(format!("cannot write {}: {e}", path.display()))
}
