//! Argument list for the packaging tool.

use std::path::Path;

use super::request::JobRequest;

/// Separator between source and destination in `--add-data`.
#[cfg(windows)]
const DATA_SEPARATOR: char = ';';
#[cfg(not(windows))]
const DATA_SEPARATOR: char = ':';

/// Builds the full argument list for one job.
///
/// `icon` and `version_file` are the files produced while preparing, if any.
/// The script path is always the last argument.
pub fn build_args(
    request: &JobRequest,
    icon: Option<&Path>,
    version_file: Option<&Path>,
) -> Vec<String> {
    let mut args = vec![
        "--onefile".to_string(),
        "--clean".to_string(),
        request.mode.flag().to_string(),
    ];

    args.extend(
        request
            .extra_modules
            .iter()
            .map(|module| format!("--hidden-import={module}")),
    );

    args.extend(
        request
            .data_files
            .iter()
            .map(|file| format!("--add-data={}{}.", file.display(), DATA_SEPARATOR)),
    );

    args.extend(request.extra_args.iter().cloned());

    args.push("--distpath".to_string());
    args.push(request.output_dir.display().to_string());
    args.push("-n".to_string());
    args.push(request.exe_name.clone());

    if let Some(icon) = icon {
        args.push(format!("--icon={}", icon.display()));
    }
    if let Some(version_file) = version_file {
        args.push(format!("--version-file={}", version_file.display()));
    }

    args.push(request.script_path.display().to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{BatchSettings, BuildMode};
    use std::path::PathBuf;

    fn request(dir: &Path, settings: BatchSettings) -> JobRequest {
        let script = dir.join("app.py");
        std::fs::write(&script, "").unwrap();
        JobRequest::from_settings(&script, &settings).unwrap()
    }

    #[test]
    fn test_minimal_args() {
        let dir = tempfile::tempdir().unwrap();
        let req = request(dir.path(), BatchSettings::default());

        let args = build_args(&req, None, None);
        assert_eq!(
            args,
            vec![
                "--onefile".to_string(),
                "--clean".to_string(),
                "--windowed".to_string(),
                "--distpath".to_string(),
                dir.path().display().to_string(),
                "-n".to_string(),
                "app".to_string(),
                req.script_path.display().to_string(),
            ]
        );
        assert!(!args.iter().any(|a| a.starts_with("--version-file")));
    }

    #[test]
    fn test_full_args_order() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("config.json");
        std::fs::write(&data, "{}").unwrap();

        let req = request(
            dir.path(),
            BatchSettings {
                mode: BuildMode::Console,
                extra_modules: "numpy, pandas".to_string(),
                extra_args: "--noupx --log-level WARN".to_string(),
                data_files: vec![data.clone()],
                ..Default::default()
            },
        );
        let icon = PathBuf::from("/tmp/app_icon_converted.ico");
        let version = PathBuf::from("/tmp/app_version_info.txt");

        let args = build_args(&req, Some(&icon), Some(&version));
        let expected_data = format!("--add-data={}{}.", data.display(), DATA_SEPARATOR);
        let expected: Vec<String> = vec![
            "--onefile",
            "--clean",
            "--console",
            "--hidden-import=numpy",
            "--hidden-import=pandas",
            expected_data.as_str(),
            "--noupx",
            "--log-level",
            "WARN",
            "--distpath",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        assert_eq!(&args[..expected.len()], &expected[..]);
        let tail = &args[expected.len()..];
        assert_eq!(tail[1], "-n");
        assert_eq!(tail[2], "app");
        assert_eq!(tail[3], "--icon=/tmp/app_icon_converted.ico");
        assert_eq!(tail[4], "--version-file=/tmp/app_version_info.txt");
        assert_eq!(tail.last().unwrap(), &req.script_path.display().to_string());
    }
}
