//! Sprout fixtures shared by unit tests.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const DEV_RECIPE: &str = r#"
include:
  - apache
  - missing

steps:
  configure-site:
    ingredient: file.managed
    name: /etc/apache2/sites-enabled/dev.conf
    source: file:///srv/files/dev.conf
    require: apache:install-apache
  reload-apache:
    ingredient: service.running
    name: apache2
    watch:
      - configure-site
"#;

pub const INDEPENDENT_RECIPE: &str = r#"
steps:
  hello:
    ingredient: cmd.run
    name: echo hello
"#;

pub const APACHE_INIT_RECIPE: &str = r#"
include:
  - apache

steps:
  install-apache:
    ingredient: pkg.installed
    name: apache2
"#;

/// Write `content` to `base/rel`, creating parent directories.
pub fn write_recipe(base: &Path, rel: &str, content: &str) -> PathBuf {
    let path = base.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

/// An empty sprout; the returned base path is canonical.
pub fn empty_sprout() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let base = std::fs::canonicalize(dir.path()).unwrap();
    (dir, base)
}

/// `dev.grlx` (includes `apache` and `missing`), `independent.grlx` and
/// `apache/init.grlx` (includes itself).
pub fn test_sprout() -> (TempDir, PathBuf) {
    let (dir, base) = empty_sprout();
    write_recipe(&base, "dev.grlx", DEV_RECIPE);
    write_recipe(&base, "independent.grlx", INDEPENDENT_RECIPE);
    write_recipe(&base, "apache/init.grlx", APACHE_INIT_RECIPE);
    (dir, base)
}
