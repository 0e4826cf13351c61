use std::io::Write;
use std::path::Path;

/// Write `data` to a sibling temp file and rename it over `path`, so a crash
/// never leaves a truncated config behind.
pub(crate) fn write_atomic(path: &Path, data: &[u8], mode: Option<u32>) -> crate::Result<()> {
    let write_err = |e| crate::Error::ConfigWrite {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config".to_owned());
    let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

    let mut file = std::fs::File::create(&tmp_path).map_err(write_err)?;
    set_mode(&file, mode).map_err(write_err)?;
    file.write_all(data).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;
    drop(file);

    std::fs::rename(&tmp_path, path).map_err(write_err)
}

#[cfg(unix)]
fn set_mode(file: &std::fs::File, mode: Option<u32>) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    match mode {
        Some(mode) => file.set_permissions(std::fs::Permissions::from_mode(mode)),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn set_mode(_file: &std::fs::File, _mode: Option<u32>) -> std::io::Result<()> {
    Ok(())
}
