use std::ffi::OsString;
use std::{fs, io::Write, path::Path, path::PathBuf};

/// Sibling temp path: `cal.json` -> `cal.json.tmp`.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("calibration"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace `path` with `bytes` without ever exposing a half-written file.
///
/// Writes a sibling temp file, fsyncs it, then renames it over the target. A crash
/// before the rename leaves the previous file intact; the stray temp file is
/// overwritten by the next save.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = temp_path(path);
    let written = (|| {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path)?;

    // Persist the rename itself; not supported on every platform.
    #[cfg(unix)]
    {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty())
            && let Ok(d) = fs::File::open(dir)
        {
            let _ = d.sync_all();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_existing_content_and_cleans_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cal.json");
        fs::write(&path, b"old").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn missing_parent_directory_fails_without_touching_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent").join("cal.json");
        assert!(write_atomic(&path, b"x").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn temp_name_keeps_extension() {
        let p = Path::new("/var/lib/scale_config.json");
        assert_eq!(temp_path(p), Path::new("/var/lib/scale_config.json.tmp"));
    }
}
