use std::fs;
use std::path::{Path, PathBuf};

/// Write an `sh` script to `dir/name` and mark it executable.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&path).expect("script metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod script");
    }

    path
}

/// Server that echoes each stdin line back as `got: <line>` until EOF.
pub fn echo_server(dir: &Path, name: &str) -> PathBuf {
    write_script(
        dir,
        name,
        r#"echo "ready"
while IFS= read -r line; do
  echo "got: $line"
done"#,
    )
}

/// Server that prints once and then idles until killed.
pub fn idle_server(dir: &Path, name: &str) -> PathBuf {
    write_script(dir, name, "echo \"started $$\"\nexec sleep 300")
}

/// Install root with a `.env.example` template and a data directory.
///
/// Returns `(install_root, data_dir)`; `.env.example` points
/// `MS2_DATA_FOLDER` at the data directory.
pub fn install_root_with_template(base: &Path) -> (PathBuf, PathBuf) {
    let root = base.join("Maple2");
    let data = base.join("Data");
    fs::create_dir_all(&root).expect("create install root");
    fs::create_dir_all(&data).expect("create data dir");
    fs::write(
        root.join(".env.example"),
        format!(
            "DB_IP=localhost\nDB_PORT=3306\nDB_USER=root\nDB_PASSWORD=\nMS2_DATA_FOLDER={}\n",
            data.display()
        ),
    )
    .expect("write template");
    (root, data)
}
