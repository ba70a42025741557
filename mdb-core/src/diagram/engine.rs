//! The external diagram engine contract and the mermaid-cli backend.

use crate::error::MdbError;

/// Output of one engine render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDiagram {
    pub svg: String,
}

/// Text DSL in, SVG out.
///
/// Implementations may hold process-wide state and are never called
/// concurrently from one pass. `initialize` must be idempotent.
#[allow(async_fn_in_trait)]
pub trait DiagramEngine {
    fn initialize(&self) -> Result<(), MdbError> {
        Ok(())
    }

    /// `id` is unique per call and should end up as the root `<svg>` id.
    async fn render(&self, id: &str, source: &str) -> Result<RenderedDiagram, MdbError>;
}

#[cfg(feature = "native-export")]
pub use native::MermaidCliEngine;

#[cfg(feature = "native-export")]
mod native {
    use super::{DiagramEngine, RenderedDiagram};
    use crate::error::MdbError;
    use log::{debug, info};
    use std::env;
    use std::path::PathBuf;
    use std::sync::OnceLock;
    use tempfile::tempdir;
    use tokio::process::Command;
    use which::which;

    /// id mermaid-cli assigns to the root `<svg>` of every diagram
    const MMDC_SVG_ID: &str = "my-svg";

    static MMDC_BINARY: OnceLock<Option<PathBuf>> = OnceLock::new();

    /// Shells out to `mmdc` (mermaid-cli), one process per diagram.
    #[derive(Debug, Default, Clone)]
    pub struct MermaidCliEngine {
        binary: Option<PathBuf>,
    }

    impl MermaidCliEngine {
        /// `binary` overrides detection (`MDB_MMDC_BIN`, then `PATH`).
        pub fn new(binary: Option<PathBuf>) -> Self {
            Self { binary }
        }

        fn binary(&self) -> Result<PathBuf, MdbError> {
            if let Some(path) = &self.binary {
                return Ok(path.clone());
            }
            MMDC_BINARY
                .get_or_init(resolve_mmdc_binary)
                .clone()
                .ok_or_else(|| {
                    MdbError::DiagramRender(
                        "Unable to locate mermaid-cli (mmdc). Set MDB_MMDC_BIN to override the detection."
                            .to_string(),
                    )
                })
        }
    }

    fn resolve_mmdc_binary() -> Option<PathBuf> {
        if let Some(path) = env::var_os("MDB_MMDC_BIN") {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        let found = which("mmdc").ok();
        if let Some(path) = &found {
            info!("using mermaid-cli at {}", path.display());
        }
        found
    }

    impl DiagramEngine for MermaidCliEngine {
        fn initialize(&self) -> Result<(), MdbError> {
            self.binary().map(|_| ())
        }

        async fn render(&self, id: &str, source: &str) -> Result<RenderedDiagram, MdbError> {
            let mmdc = self.binary()?;
            let work = tempdir()?;
            let input = work.path().join("diagram.mmd");
            let output = work.path().join("diagram.svg");
            tokio::fs::write(&input, source).await?;

            debug!("rendering diagram {id} with {}", mmdc.display());
            let result = Command::new(&mmdc)
                .arg("-i")
                .arg(&input)
                .arg("-o")
                .arg(&output)
                .arg("-q")
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|e| {
                    MdbError::DiagramRender(format!(
                        "Failed to launch mmdc ({}): {e}",
                        mmdc.display()
                    ))
                })?;

            if !result.status.success() {
                let stderr = String::from_utf8_lossy(&result.stderr);
                let message = stderr
                    .lines()
                    .find(|l| !l.trim().is_empty())
                    .unwrap_or("mmdc exited with an error");
                return Err(MdbError::DiagramRender(format!(
                    "{} ({})",
                    message.trim(),
                    result.status
                )));
            }

            let svg = tokio::fs::read_to_string(&output).await.map_err(|e| {
                MdbError::DiagramRender(format!("mmdc produced no output: {e}"))
            })?;
            Ok(RenderedDiagram {
                svg: svg.replace(MMDC_SVG_ID, id),
            })
        }
    }
}
