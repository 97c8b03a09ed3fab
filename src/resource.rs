//! Obscured media assets (`.rpgmvp`, `.rpgmvo`, `.rpgmvm` and the `_`-suffixed variants).
//!
//! Such a file is a 16-byte fake header followed by the real file, whose first 16 bytes are
//! XORed with the project key from `System.json`.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;

use crate::err::ResourceError;
use crate::external::ExternalDecrypter;

pub const ASSET_HEADER_LEN: usize = 16;

/// `RPGMV\0\0\0` + version `00 03 01` + zero padding.
pub const ASSET_HEADER: [u8; ASSET_HEADER_LEN] = [
    0x52, 0x50, 0x47, 0x4d, 0x56, 0x00, 0x00, 0x00, 0x00, 0x03, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
];

const OBSCURED_SPAN: usize = 16;

/// Removes the fake header and the XOR prefix.
pub fn decrypt(source: &[u8], key: &[u8], verify_header: bool) -> Result<Vec<u8>, ResourceError> {
    if source.len() < ASSET_HEADER_LEN {
        return Err(ResourceError::TooShort {
            len: source.len(),
            header_len: ASSET_HEADER_LEN,
        });
    }

    let (header, payload) = source.split_at(ASSET_HEADER_LEN);
    if verify_header && header != ASSET_HEADER {
        return Err(ResourceError::HeaderMismatch {
            found: header.to_vec(),
        });
    }

    let mut out = payload.to_vec();
    xor_prefix(&mut out, key);
    Ok(out)
}

/// Produces the obscured form of `payload`; the inverse of [`decrypt`].
pub fn obscure(payload: &[u8], key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ASSET_HEADER_LEN + payload.len());
    out.extend_from_slice(&ASSET_HEADER);
    out.extend_from_slice(payload);
    xor_prefix(&mut out[ASSET_HEADER_LEN..], key);
    out
}

fn xor_prefix(data: &mut [u8], key: &[u8]) {
    let n = OBSCURED_SPAN.min(data.len()).min(key.len());
    for (b, k) in data[..n].iter_mut().zip(key) {
        *b ^= k;
    }
}

/// Parses the hex key stored in `System.json`.
pub fn parse_key(hex: &str) -> Result<Vec<u8>, ResourceError> {
    let trimmed = hex.trim();
    let invalid = || ResourceError::InvalidKey {
        key: hex.to_owned(),
    };

    if trimmed.is_empty() || trimmed.len() % 2 != 0 || !trimmed.is_ascii() {
        return Err(invalid());
    }

    (0..trimmed.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&trimmed[i..i + 2], 16).map_err(|_| invalid()))
        .collect()
}

/// Reads and validates `encryptionKey` from a `System.json` file.
///
/// Returns the key in lowercase hex, or `None` when the file is unreadable or the key is
/// absent or malformed.
pub fn read_encryption_key(system_json: &Path) -> Option<String> {
    let raw = fs::read(system_json).ok()?;
    let value: Value = serde_json::from_slice(strip_bom(&raw)).ok()?;
    let key = value.get("encryptionKey")?.as_str()?.trim().to_lowercase();

    match parse_key(&key) {
        Ok(_) => Some(key),
        Err(e) => {
            warn!("ignoring key in `{}`: {}", system_json.display(), e);
            None
        }
    }
}

pub(crate) fn strip_bom(raw: &[u8]) -> &[u8] {
    raw.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(raw)
}

/// Maps an obscured extension to the real media extension.
pub fn real_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "rpgmvp" | "png_" => Some("png"),
        "rpgmvm" | "m4a_" => Some("m4a"),
        "rpgmvo" | "ogg_" => Some("ogg"),
        _ => None,
    }
}

pub fn is_obscured_asset(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(real_extension)
        .is_some()
}

/// Recursively lists obscured assets under `root`, skipping `data_cache` directories.
pub fn scan_obscured_assets(root: &Path) -> Vec<PathBuf> {
    let pattern = format!("{}/**/*", glob::Pattern::escape(&root.to_string_lossy()));

    let paths = match glob::glob(&pattern) {
        Ok(paths) => paths,
        Err(e) => {
            warn!("cannot scan `{}`: {}", root.display(), e);
            return Vec::new();
        }
    };

    paths
        .flatten()
        .filter(|p| p.is_file() && is_obscured_asset(p))
        .filter(|p| {
            !p.strip_prefix(root)
                .unwrap_or(p)
                .components()
                .any(|c| c.as_os_str() == "data_cache")
        })
        .collect()
}

/// Decrypts one file into `output`, creating parent directories as needed.
pub fn decrypt_file(
    source: &Path,
    output: &Path,
    key: &[u8],
    verify_header: bool,
) -> Result<(), ResourceError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ResourceError::Io { path, source }
    };

    let data = fs::read(source).map_err(io_err(source))?;
    let plain = decrypt(&data, key, verify_header)?;

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    fs::write(output, plain).map_err(io_err(output))
}

/// Where a decrypted copy of `source` (relative to `root`) lands under `output_dir`.
pub fn output_path_for(root: &Path, source: &Path, output_dir: &Path) -> PathBuf {
    let relative = source.strip_prefix(root).unwrap_or(source);
    let mut target = output_dir.join(relative);
    if let Some(ext) = relative
        .extension()
        .and_then(|e| e.to_str())
        .and_then(real_extension)
    {
        target.set_extension(ext);
    }
    target
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSettings {
    verify_header: bool,
    num_threads: usize,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        ResourceSettings {
            verify_header: true,
            num_threads: 0,
        }
    }
}

impl ResourceSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject files whose fake header does not match the signature.
    pub fn verify_header(mut self, verify_header: bool) -> Self {
        self.verify_header = verify_header;
        self
    }

    /// Sets the number of worker threads, `0` for one per core.
    ///
    /// Has no effect unless the `multithreading` feature is enabled.
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn get_verify_header(&self) -> bool {
        self.verify_header
    }

    pub fn get_num_threads(&self) -> usize {
        self.num_threads
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrepareStatus {
    /// No obscured assets were found.
    NotNeeded,
    Decrypted,
    PartiallyFailed,
    KeyUnavailable,
    ExternalDecrypted,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrepareMethod {
    None,
    Builtin,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrepareReport {
    pub status: PrepareStatus,
    pub method: PrepareMethod,
    pub message: String,
    pub output_dir: PathBuf,
    pub processed_files: usize,
    pub failed_files: usize,
}

impl PrepareReport {
    fn new(status: PrepareStatus, method: PrepareMethod, output_dir: &Path) -> Self {
        PrepareReport {
            status,
            method,
            message: String::new(),
            output_dir: output_dir.to_path_buf(),
            processed_files: 0,
            failed_files: 0,
        }
    }

    fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    fn counts(mut self, processed: usize, failed: usize) -> Self {
        self.processed_files = processed;
        self.failed_files = failed;
        self
    }
}

/// `System.json` locations, in lookup order.
pub fn system_json_candidates(game_root: &Path, data_dir: &Path) -> [PathBuf; 3] {
    [
        data_dir.join("System.json"),
        game_root.join("www").join("data").join("System.json"),
        game_root.join("data").join("System.json"),
    ]
}

/// Decrypts every obscured asset of a project into `cache_dir/decrypted`.
///
/// Each file succeeds or fails on its own. When the key is missing or some files fail, the
/// `external` decrypter (if any) gets a chance to process the whole tree.
pub fn prepare_resources(
    game_root: &Path,
    data_dir: &Path,
    cache_dir: &Path,
    settings: &ResourceSettings,
    external: Option<&dyn ExternalDecrypter>,
) -> PrepareReport {
    let output_dir = cache_dir.join("decrypted");
    let sources = scan_obscured_assets(game_root);

    if sources.is_empty() {
        info!("no obscured assets under `{}`", game_root.display());
        return PrepareReport::new(PrepareStatus::NotNeeded, PrepareMethod::None, &output_dir)
            .message(
                "No obscured assets found; the game may pack its resources (e.g. nw.pak) or ship them in plain form.",
            );
    }

    let key = system_json_candidates(game_root, data_dir)
        .iter()
        .find(|p| p.is_file())
        .and_then(|p| read_encryption_key(p))
        .and_then(|hex| parse_key(&hex).ok());

    let Some(key) = key else {
        info!("no usable encryption key for `{}`", game_root.display());
        return match external {
            Some(external) => run_external(
                external,
                game_root,
                &output_dir,
                (0, sources.len()),
                "System.json has no valid encryptionKey.",
            ),
            None => {
                PrepareReport::new(PrepareStatus::KeyUnavailable, PrepareMethod::None, &output_dir)
                    .message("System.json has no valid encryptionKey.")
                    .counts(0, sources.len())
            }
        };
    };

    let failed = decrypt_all(&sources, game_root, &output_dir, &key, settings);
    let processed = sources.len() - failed;
    info!(
        "decrypted {} of {} assets into `{}`",
        processed,
        sources.len(),
        output_dir.display()
    );

    if failed == 0 {
        return PrepareReport::new(PrepareStatus::Decrypted, PrepareMethod::Builtin, &output_dir)
            .message(format!("Decrypted {processed} files."))
            .counts(processed, 0);
    }

    let summary = format!("Decrypted {processed} files, {failed} failed.");
    match external {
        Some(external) => run_external(
            external,
            game_root,
            &output_dir,
            (processed, failed),
            &summary,
        ),
        None => PrepareReport::new(
            PrepareStatus::PartiallyFailed,
            PrepareMethod::Builtin,
            &output_dir,
        )
        .message(summary)
        .counts(processed, failed),
    }
}

fn run_external(
    external: &dyn ExternalDecrypter,
    game_root: &Path,
    output_dir: &Path,
    (processed, failed): (usize, usize),
    builtin_summary: &str,
) -> PrepareReport {
    let outcome = external.decrypt_tree(game_root, output_dir);
    // Counts always describe the built-in pass; the external tool reports no per-file results.
    if outcome.success {
        PrepareReport::new(
            PrepareStatus::ExternalDecrypted,
            PrepareMethod::External,
            output_dir,
        )
        .message(outcome.message)
        .counts(processed, failed)
    } else {
        PrepareReport::new(PrepareStatus::Failed, PrepareMethod::External, output_dir)
            .message(format!("{builtin_summary} {}", outcome.message))
            .counts(processed, failed)
    }
}

/// Returns the number of failed files.
fn decrypt_all(
    sources: &[PathBuf],
    root: &Path,
    output_dir: &Path,
    key: &[u8],
    settings: &ResourceSettings,
) -> usize {
    let decrypt_one = |source: &PathBuf| -> bool {
        let target = output_path_for(root, source, output_dir);
        match decrypt_file(source, &target, key, settings.get_verify_header()) {
            Ok(()) => {
                debug!("{} -> {}", source.display(), target.display());
                true
            }
            Err(e) => {
                warn!("failed to decrypt `{}`: {}", source.display(), e);
                false
            }
        }
    };

    #[cfg(feature = "multithreading")]
    {
        use rayon::prelude::*;

        if settings.get_num_threads() != 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(settings.get_num_threads())
                .build();
            match pool {
                Ok(pool) => {
                    return pool.install(|| {
                        sources
                            .par_iter()
                            .map(decrypt_one)
                            .filter(|ok| !ok)
                            .count()
                    });
                }
                Err(e) => warn!("falling back to sequential decryption: {}", e),
            }
        }
    }

    sources.iter().map(decrypt_one).filter(|ok| !ok).count()
}
