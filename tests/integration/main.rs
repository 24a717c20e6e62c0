//! Integration tests for gfo

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::collections::HashMap;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::path::{Path, PathBuf};
    use std::thread;
    use tempfile::TempDir;

    fn gfo() -> Command {
        let mut cmd = cargo_bin_cmd!("gfo");
        cmd.env_remove("RUST_LOG").env_remove("GFO_WORKERS");
        // The upstream stub listens on localhost
        for var in ["HTTP_PROXY", "http_proxy", "HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"] {
            cmd.env_remove(var);
        }
        cmd
    }

    type Routes = HashMap<String, (u16, Vec<u8>)>;

    /// Serve canned responses by request path until the test process exits.
    /// `routes` receives the stub's base URL so responses can point back at it.
    fn upstream_stub(routes: impl FnOnce(&str) -> Routes) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let routes = routes(&base);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut reader = BufReader::new(stream.try_clone().unwrap());

                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                loop {
                    let mut header = String::new();
                    if reader.read_line(&mut header).unwrap() == 0 || header == "\r\n" {
                        break;
                    }
                }

                let target = request_line.split_whitespace().nth(1).unwrap_or("/");
                let path = target.split('?').next().unwrap_or("/");
                let (status, body) = routes
                    .get(path)
                    .cloned()
                    .unwrap_or((404, b"not found".to_vec()));

                let head = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes());
                let _ = stream.write_all(&body);
            }
        });

        base
    }

    /// Write a config that keeps the cache inside `temp`
    fn write_config(temp: &TempDir, upstream: Option<&str>) -> PathBuf {
        let cache_dir = temp.path().join("fonts");
        let mut toml = format!(
            "[cache]\ndirectory = '{}'\nttl_seconds = 3600\n",
            cache_dir.display()
        );
        if let Some(base) = upstream {
            toml.push_str(&format!(
                "\n[upstream]\ncss_url = '{base}/css'\ncss2_url = '{base}/css2'\ntimeout_secs = 5\n"
            ));
        }
        let path = temp.path().join("config.toml");
        std::fs::write(&path, toml).unwrap();
        path
    }

    fn zip_names(path: &Path) -> Vec<String> {
        let file = std::fs::File::open(path).unwrap();
        let archive = zip::ZipArchive::new(file).unwrap();
        archive.file_names().map(str::to_string).collect()
    }

    #[test]
    fn help_displays() {
        gfo()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("caching proxy"));
    }

    #[test]
    fn version_displays() {
        gfo()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("gfo"));
    }

    #[test]
    fn config_path_honors_flag() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");

        gfo()
            .arg("--config")
            .arg(&path)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("custom.toml"));
    }

    #[test]
    fn config_init_show_get() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("gfo").join("config.toml");

        gfo()
            .arg("-c")
            .arg(&path)
            .args(["config", "init"])
            .assert()
            .success();
        assert!(path.exists());

        gfo()
            .arg("-c")
            .arg(&path)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]").and(predicate::str::contains("[election]")));

        gfo()
            .arg("-c")
            .arg(&path)
            .args(["config", "get", "cache.ttl_seconds"])
            .assert()
            .success()
            .stdout(predicate::str::diff("3600\n"));
    }

    #[test]
    fn missing_explicit_config_fails() {
        let temp = TempDir::new().unwrap();

        gfo()
            .arg("-c")
            .arg(temp.path().join("absent.toml"))
            .args(["cache", "stats"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("gfo config init"));
    }

    #[test]
    fn prestart_prepares_cache_dir() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp, None);
        let cache_dir = temp.path().join("fonts");
        std::fs::create_dir_all(&cache_dir).unwrap();
        std::fs::write(cache_dir.join("leftover"), b"x").unwrap();

        gfo().arg("-c").arg(&config).arg("prestart").assert().success();

        assert!(cache_dir.join(".ipc").is_dir());
        assert!(!cache_dir.join("leftover").exists());
    }

    #[test]
    fn cache_stats_json_on_empty_cache() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp, None);

        gfo()
            .arg("-c")
            .arg(&config)
            .args(["cache", "stats", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"entries\": 0"));
    }

    #[test]
    fn unknown_font_exits_not_found() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp, None);

        gfo()
            .arg("-c")
            .arg(&config)
            .args(["font", "0123456789abcdef0123456789abcdef"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("not found"));
    }

    #[test]
    fn worker_without_count_fails() {
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp, None);

        gfo()
            .arg("-c")
            .arg(&config)
            .arg("worker")
            .assert()
            .code(1)
            .stderr(predicate::str::contains("--workers"));
    }

    #[cfg(unix)]
    #[test]
    fn worker_stops_cleanly_on_sigterm() {
        use std::process::{Command as StdCommand, Stdio};
        use std::time::{Duration, Instant};

        let temp = TempDir::new().unwrap();
        let config = write_config(&temp, None);

        let mut child = StdCommand::new(env!("CARGO_BIN_EXE_gfo"))
            .env_remove("RUST_LOG")
            .env_remove("GFO_WORKERS")
            .arg("-c")
            .arg(&config)
            .args(["worker", "--workers", "1"])
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();

        let mut stderr = BufReader::new(child.stderr.take().unwrap());
        let mut line = String::new();
        while !line.contains("running as") {
            line.clear();
            assert!(stderr.read_line(&mut line).unwrap() > 0, "worker exited early");
        }
        let cache_dir = temp.path().join("fonts");
        assert!(staging_dirs(&cache_dir) > 0);

        unsafe {
            libc::kill(child.id() as libc::pid_t, libc::SIGTERM);
        }

        let deadline = Instant::now() + Duration::from_secs(10);
        let status = loop {
            if let Some(status) = child.try_wait().unwrap() {
                break status;
            }
            if Instant::now() > deadline {
                let _ = child.kill();
                panic!("worker ignored SIGTERM");
            }
            thread::sleep(Duration::from_millis(50));
        };

        let mut rest = String::new();
        std::io::Read::read_to_string(&mut stderr, &mut rest).unwrap();

        assert!(status.success(), "worker exited with {status}: {rest}");
        assert!(rest.contains("SIGTERM"));
        assert_eq!(staging_dirs(&cache_dir), 0);
    }

    fn staging_dirs(cache_dir: &Path) -> usize {
        std::fs::read_dir(cache_dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with("stage-"))
            .count()
    }

    #[test]
    fn css2_resolves_and_bundles() {
        const FONT_PATH: &str = "/s/lato/v24/lato.woff2";
        let base = upstream_stub(|base| {
            let css = format!(
                "@font-face {{\n  font-family: 'Lato';\n  src: url({base}{FONT_PATH}) format('woff2');\n}}\n"
            );
            HashMap::from([
                ("/css2".to_string(), (200, css.into_bytes())),
                (FONT_PATH.to_string(), (200, b"wOF2-lato".to_vec())),
            ])
        });

        let temp = TempDir::new().unwrap();
        let config = write_config(&temp, Some(&base));
        let out = temp.path().join("fonts.css");
        let bundle = temp.path().join("fonts.zip");

        gfo()
            .arg("-c")
            .arg(&config)
            .args(["css2", "--family", "Lato", "--display", "swap"])
            .arg("--output")
            .arg(&out)
            .arg("--bundle")
            .arg(&bundle)
            .assert()
            .success();

        let css = std::fs::read_to_string(&out).unwrap();
        assert!(css.contains("url(/font/"));
        assert!(!css.contains(FONT_PATH));

        let names = zip_names(&bundle);
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"fonts.css".to_string()));

        // The rewritten key resolves back to the cached font
        let key = css
            .split("/font/")
            .nth(1)
            .and_then(|rest| rest.split(')').next())
            .unwrap()
            .to_string();
        assert!(names.contains(&key));

        let copy = temp.path().join("lato.woff2");
        gfo()
            .arg("-c")
            .arg(&config)
            .args(["font", &key, "--output"])
            .arg(&copy)
            .assert()
            .success();
        assert_eq!(std::fs::read(&copy).unwrap(), b"wOF2-lato");
    }

    #[test]
    fn upstream_bad_request_exits_client_error() {
        let base = upstream_stub(|_| HashMap::from([("/css".to_string(), (400, b"bad".to_vec()))]));
        let temp = TempDir::new().unwrap();
        let config = write_config(&temp, Some(&base));

        gfo()
            .arg("-c")
            .arg(&config)
            .args(["css", "--family", "Nope"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("HTTP 400"));
    }
}
