//! Shared fixtures: a scripted diagram engine and small helpers.

use mdb_core::{Beautifier, ComrakParser, DiagramEngine, MdbError, RenderedDiagram, ThemeResolver};
use std::cell::RefCell;

/// Renders a fixed box per diagram; sources containing `broken` fail.
#[derive(Default)]
pub struct StubEngine {
    pub ids: RefCell<Vec<String>>,
}

impl DiagramEngine for StubEngine {
    async fn render(&self, id: &str, source: &str) -> Result<RenderedDiagram, MdbError> {
        self.ids.borrow_mut().push(id.to_string());
        if source.contains("broken") {
            return Err(MdbError::DiagramRender("Parse error on line 2".into()));
        }
        Ok(RenderedDiagram {
            svg: format!(
                r##"<svg id="{id}" xmlns="http://www.w3.org/2000/svg" width="60" height="30" viewBox="0 0 60 30"><g class="nodes"><rect width="60" height="30" fill="#fff4dd"/></g><g class="edgePaths"><path d="M0 0L60 30" stroke="#000"/></g></svg>"##
            ),
        })
    }
}

pub fn beautifier() -> Beautifier<ComrakParser, StubEngine> {
    Beautifier::new(ComrakParser::new(), StubEngine::default(), ThemeResolver::default())
        .with_theme("basic")
}

pub const HELLO: &str = "# Hi\n\n```mermaid\nflowchart TD\nA-->B\n```";

#[cfg(unix)]
pub fn write_script(dir: &std::path::Path, name: &str, body: &str) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}
