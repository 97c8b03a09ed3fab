//! Hand-off to an external decryption tool for asset trees the built-in decryptor cannot handle.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::SystemTime;

use log::{debug, info};

/// Environment variable naming the decrypter jar.
pub const JAVA_DECRYPTER_JAR_ENV: &str = "RPGMV_JAVA_DECRYPTER_JAR";

const JAR_SEARCH_PATTERN: &str = "Java-RPG-Maker-MV-Decrypter-master/**/target/*.jar";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalOutcome {
    pub success: bool,
    pub message: String,
}

impl ExternalOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        ExternalOutcome {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        ExternalOutcome {
            success: false,
            message: message.into(),
        }
    }
}

/// Decrypts every asset below `source_root` into `output_dir`.
pub trait ExternalDecrypter: Sync {
    fn decrypt_tree(&self, source_root: &Path, output_dir: &Path) -> ExternalOutcome;
}

impl<F> ExternalDecrypter for F
where
    F: Fn(&Path, &Path) -> ExternalOutcome + Sync,
{
    fn decrypt_tree(&self, source_root: &Path, output_dir: &Path) -> ExternalOutcome {
        self(source_root, output_dir)
    }
}

/// Runs the Java "RPG Maker MV Decrypter" command line.
#[derive(Debug, Clone)]
pub struct JavaDecrypter {
    jar: Option<PathBuf>,
    java: PathBuf,
}

impl JavaDecrypter {
    pub fn new(jar: Option<PathBuf>) -> Self {
        JavaDecrypter {
            jar,
            java: PathBuf::from("java"),
        }
    }

    /// Uses the jar named by [`JAVA_DECRYPTER_JAR_ENV`], else searches `search_roots`.
    pub fn discover(search_roots: &[&Path]) -> Self {
        let from_env = env::var_os(JAVA_DECRYPTER_JAR_ENV)
            .map(PathBuf::from)
            .filter(|p| p.is_file());

        let jar = from_env.or_else(|| search_roots.iter().find_map(|root| find_jar(root)));
        debug!("java decrypter jar: {:?}", jar);
        Self::new(jar)
    }

    pub fn with_java(mut self, java: impl Into<PathBuf>) -> Self {
        self.java = java.into();
        self
    }

    pub fn jar(&self) -> Option<&Path> {
        self.jar.as_deref()
    }
}

/// Newest matching jar below `root`, preferring the tool's own artifact name.
fn find_jar(root: &Path) -> Option<PathBuf> {
    let pattern = format!(
        "{}/{}",
        glob::Pattern::escape(&root.to_string_lossy()),
        JAR_SEARCH_PATTERN
    );
    let candidates: Vec<PathBuf> = glob::glob(&pattern).ok()?.flatten().collect();

    let modified = |p: &PathBuf| {
        p.metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH)
    };
    let preferred = |p: &PathBuf| {
        p.file_name()
            .map(|n| n.to_string_lossy().contains("RPG Maker MV Decrypter"))
            .unwrap_or(false)
    };

    candidates
        .into_iter()
        .max_by_key(|p| (preferred(p), modified(p)))
}

impl ExternalDecrypter for JavaDecrypter {
    fn decrypt_tree(&self, source_root: &Path, output_dir: &Path) -> ExternalOutcome {
        let Some(jar) = &self.jar else {
            return ExternalOutcome::failed(format!(
                "Java decrypter jar not found; set {JAVA_DECRYPTER_JAR_ENV}."
            ));
        };

        if let Err(e) = std::fs::create_dir_all(output_dir) {
            return ExternalOutcome::failed(format!(
                "cannot create `{}`: {e}",
                output_dir.display()
            ));
        }

        info!(
            "running {} -jar {} on `{}`",
            self.java.display(),
            jar.display(),
            source_root.display()
        );
        let output = Command::new(&self.java)
            .arg("-jar")
            .arg(jar)
            .arg("decrypt")
            .arg(source_root)
            .arg(output_dir)
            .args(["false", "true", "auto"])
            .output();

        match output {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                ExternalOutcome::failed("Java runtime not found on PATH.")
            }
            Err(e) => ExternalOutcome::failed(format!("failed to start Java decrypter: {e}")),
            Ok(output) if output.status.success() => {
                ExternalOutcome::ok("Decrypted with the Java decrypter.")
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let stdout = String::from_utf8_lossy(&output.stdout);
                let detail = stderr
                    .lines()
                    .chain(stdout.lines())
                    .filter(|l| !l.trim().is_empty())
                    .last()
                    .unwrap_or("no output");
                ExternalOutcome::failed(format!(
                    "Java decrypter exited with {}: {}",
                    output.status, detail
                ))
            }
        }
    }
}
