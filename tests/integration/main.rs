//! Integration tests for trymod

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    /// trymod with an isolated cache and config, never starting the REPL
    fn trymod(cache: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("trymod");
        cmd.env("TRYMOD_PATH", cache)
            .env("TRYMOD_CONFIG", cache.join("config.toml"))
            .env("TRYMOD_NONINTERACTIVE", "1")
            .env_remove("TRYMOD_HISTORY_PATH");
        cmd
    }

    fn seed_package(cache: &Path, name: &str) {
        let dir = cache.join("node_modules").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("package.json"),
            format!(r#"{{"name":"{name}","version":"1.0.0"}}"#),
        )
        .unwrap();
        std::fs::write(dir.join("index.js"), "module.exports = {}\n").unwrap();
    }

    /// Config pointing the installer somewhere it cannot run
    fn offline_config(cache: &Path) {
        std::fs::write(
            cache.join("config.toml"),
            "[installer]\nprogram = \"/nonexistent/npm\"\n",
        )
        .unwrap();
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        trymod(temp.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Try npm packages"))
            .stdout(predicate::str::contains("--clear"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        trymod(temp.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("trymod"));
    }

    #[test]
    fn clear_removes_cached_packages() {
        let temp = TempDir::new().unwrap();
        seed_package(temp.path(), "lodash");

        trymod(temp.path())
            .arg("--clear")
            .assert()
            .success()
            .stdout(predicate::str::contains("Cache successfully cleared!"));

        assert!(!temp.path().join("node_modules").exists());
    }

    #[test]
    fn clear_on_empty_cache_succeeds() {
        let temp = TempDir::new().unwrap();
        trymod(&temp.path().join("fresh"))
            .arg("--clear")
            .assert()
            .success();
    }

    #[test]
    fn cached_package_loads_without_installer() {
        let temp = TempDir::new().unwrap();
        offline_config(temp.path());
        seed_package(temp.path(), "my-pkg.io");

        trymod(temp.path())
            .arg("my-pkg.io")
            .assert()
            .success()
            .stdout(predicate::str::contains("was already installed"))
            .stdout(predicate::str::contains(
                "Package 'my-pkg.io' was loaded and assigned to 'my_pkg_io'",
            ))
            .stdout(predicate::str::contains("REPL started..."));
    }

    #[test]
    fn unloadable_cached_package_is_not_announced() {
        let temp = TempDir::new().unwrap();
        offline_config(temp.path());
        let dir = temp.path().join("node_modules").join("broken-entry");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("package.json"), r#"{"main":"missing.js"}"#).unwrap();

        trymod(temp.path())
            .arg("broken-entry")
            .assert()
            .failure()
            .stdout(predicate::str::contains("REPL started...").not());
    }

    #[test]
    fn explicit_alias_is_used() {
        let temp = TempDir::new().unwrap();
        offline_config(temp.path());
        seed_package(temp.path(), "lodash");

        trymod(temp.path())
            .arg("lodash=_")
            .assert()
            .success()
            .stdout(predicate::str::contains("assigned to '_'"));
    }

    #[test]
    fn no_packages_still_starts() {
        let temp = TempDir::new().unwrap();
        trymod(temp.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("REPL started..."));
    }

    #[test]
    fn alias_conflict_fails() {
        let temp = TempDir::new().unwrap();
        offline_config(temp.path());

        trymod(temp.path())
            .args(["my-pkg", "my.pkg"])
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("Alias 'my_pkg'"));
    }

    #[test]
    fn install_failure_exits_nonzero() {
        let temp = TempDir::new().unwrap();
        offline_config(temp.path());

        trymod(temp.path())
            .arg("left-pad")
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("Error:"));
    }

    #[test]
    fn empty_alias_is_rejected() {
        let temp = TempDir::new().unwrap();
        trymod(temp.path()).arg("lodash=").assert().failure();
    }

    #[test]
    fn invalid_config_is_reported() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.toml"), "[installer\n").unwrap();

        trymod(temp.path())
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[cfg(unix)]
    #[test]
    fn not_found_package_is_reported() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let npm = temp.path().join("fake-npm");
        std::fs::write(
            &npm,
            "#!/bin/sh\necho '{\"error\":{\"code\":\"E404\",\"summary\":\"Not Found\"}}'\nexit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&npm, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(
            temp.path().join("config.toml"),
            format!("[installer]\nprogram = \"{}\"\n", npm.display()),
        )
        .unwrap();

        trymod(temp.path())
            .arg("nope-nope-nope")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Could not find package nope-nope-nope"));
    }
}
