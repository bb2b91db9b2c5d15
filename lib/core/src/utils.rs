use std::ffi::OsStr;
use std::fs::File;
use std::io;
use std::io::{BufRead, BufReader};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};

use flate2::read::GzDecoder;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub fn get_extension(path: &Path) -> Option<&str> {
    path.extension().and_then(OsStr::to_str)
}

pub fn read_maybe_gzip<P>(path: P) -> io::Result<Box<dyn BufRead>>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)?;
    let capacity = 128 * 1024;
    if get_extension(path) == Some("gz") {
        Ok(Box::new(BufReader::with_capacity(capacity, GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::with_capacity(capacity, file)))
    }
}

static ENV_VAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$(?:\{(\w+)\}|(\w+))").unwrap());

/// Expands `~` and `$VAR` / `${VAR}` in `path` and makes it absolute.
///
/// Unknown variables are left untouched. The result is normalized lexically,
/// symlinks are not resolved.
pub fn resolve_path<P: AsRef<Path>>(path: P) -> PathBuf {
    let raw = path.as_ref().to_string_lossy();
    let expanded = ENV_VAR.replace_all(&raw, |caps: &Captures| {
        let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
    });
    let expanded = match (expanded.strip_prefix('~'), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with('/') => {
            PathBuf::from(home).join(rest.trim_start_matches('/'))
        }
        _ => PathBuf::from(&*expanded),
    };
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir().map(|cwd| cwd.join(&expanded)).unwrap_or(expanded)
    };
    normalize(&absolute)
}

fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                result.pop();
            }
            other => result.push(other.as_os_str()),
        }
    }
    result
}

pub fn measure_time<T, F>(f: F) -> (Duration, T)
where
    F: FnOnce() -> T,
{
    let time_start = Instant::now();
    let result = f();
    (time_start.elapsed(), result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_time() {
        let (elapsed, value) = measure_time(|| {
            std::thread::sleep(Duration::from_millis(20));
            42
        });
        assert_eq!(value, 42);
        assert!(elapsed >= Duration::from_millis(20));
    }

    #[test]
    fn test_get_extension() {
        assert_eq!(get_extension(Path::new("a/b.cnf")), Some("cnf"));
        assert_eq!(get_extension(Path::new("a/b.cnf.gz")), Some("gz"));
        assert_eq!(get_extension(Path::new("a/b")), None);
    }

    #[test]
    fn test_resolve_path_is_absolute_and_normalized() {
        let path = resolve_path("some/./dir/../file.cnf");
        assert!(path.is_absolute());
        assert!(path.ends_with("some/file.cnf"));
    }

    #[test]
    fn test_resolve_path_expands_env() {
        std::env::set_var("SAT_ARENA_TEST_DIR", "/tmp/sat-arena");
        assert_eq!(resolve_path("$SAT_ARENA_TEST_DIR/x.cnf"), PathBuf::from("/tmp/sat-arena/x.cnf"));
        assert_eq!(resolve_path("${SAT_ARENA_TEST_DIR}/y.cnf"), PathBuf::from("/tmp/sat-arena/y.cnf"));
    }

    #[test]
    fn test_read_maybe_gzip_plain() -> color_eyre::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("plain.cnf");
        std::fs::write(&path, "p cnf 1 1\n1 0\n")?;
        let lines: Vec<String> = read_maybe_gzip(&path)?.lines().collect::<io::Result<_>>()?;
        assert_eq!(lines, vec!["p cnf 1 1", "1 0"]);
        Ok(())
    }

    #[test]
    fn test_read_maybe_gzip_compressed() -> color_eyre::Result<()> {
        use std::io::Write;

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("packed.cnf.gz");
        let mut encoder = flate2::write::GzEncoder::new(File::create(&path)?, flate2::Compression::default());
        encoder.write_all(b"p cnf 2 1\n-1 2 0\n")?;
        encoder.finish()?;
        let lines: Vec<String> = read_maybe_gzip(&path)?.lines().collect::<io::Result<_>>()?;
        assert_eq!(lines, vec!["p cnf 2 1", "-1 2 0"]);
        Ok(())
    }
}
