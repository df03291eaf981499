#[cfg(test)]
mod tests {
    use super::super::*;
    use std::path::Path;

    fn engine(kind: EngineKind, major: u32) -> ContainerEngine {
        ContainerEngine::new(kind, EngineVersion::new(major, 0, 0), DisabledFeatures::none())
    }

    #[test]
    fn test_version_parse() {
        assert_eq!(EngineVersion::parse("4.3.1"), EngineVersion::new(4, 3, 1));
        assert_eq!(EngineVersion::parse("20.10.21+dfsg1\n"), EngineVersion::new(20, 10, 21));
        assert_eq!(EngineVersion::parse("24.0.0-rc.2"), EngineVersion::new(24, 0, 0));
        assert_eq!(EngineVersion::parse("v3.4"), EngineVersion::new(3, 4, 0));
        assert_eq!(EngineVersion::parse("5"), EngineVersion::new(5, 0, 0));
    }

    #[test]
    fn test_version_parse_degrades_to_zero() {
        assert_eq!(EngineVersion::parse(""), EngineVersion::default());
        assert_eq!(EngineVersion::parse("unknown"), EngineVersion::new(0, 0, 0));
    }

    #[test]
    fn test_version_display_and_order() {
        assert_eq!(EngineVersion::new(4, 3, 1).to_string(), "4.3.1");
        assert!(EngineVersion::new(4, 0, 0) > EngineVersion::new(3, 9, 9));
    }

    #[test]
    fn test_capability_matrix() {
        let podman3 = engine(EngineKind::Podman, 3);
        assert!(!podman3.supports_cache_mount());
        assert!(!podman3.supports_cache_mount_selinux_relabeling());

        let podman4 = engine(EngineKind::Podman, 4);
        assert!(podman4.supports_cache_mount());
        assert!(podman4.supports_cache_mount_selinux_relabeling());

        let podman5 = engine(EngineKind::Podman, 5);
        assert!(podman5.supports_cache_mount());

        // Docker supports cache mounts whatever version was read.
        for major in [0, 18, 24] {
            let docker = engine(EngineKind::Docker, major);
            assert!(docker.supports_cache_mount());
            assert!(!docker.supports_cache_mount_selinux_relabeling());
        }
    }

    #[test]
    fn test_portable_disables_cache_mount() {
        for kind in EngineKind::ALL {
            let engine = ContainerEngine::new(
                kind,
                EngineVersion::new(5, 0, 0),
                DisabledFeatures::portable(),
            );
            assert!(!engine.supports_cache_mount());
            assert!(!engine.supports_cache_mount_selinux_relabeling());
        }
    }

    #[test]
    fn test_docker_build_command_enables_buildkit() {
        let cmd = engine(EngineKind::Docker, 24).build_command(
            Path::new("Containerfile.x1"),
            "web:latest",
            Path::new("/src/web"),
        );
        assert_eq!(cmd.program(), "docker");
        assert_eq!(
            cmd.get_args(),
            ["build", "-f", "Containerfile.x1", "-t", "web:latest", "/src/web"]
        );
        assert_eq!(
            cmd.get_env(),
            [("DOCKER_BUILDKIT".to_string(), "1".to_string())]
        );
    }

    #[test]
    fn test_docker_build_command_without_cache_mount() {
        let docker = ContainerEngine::new(
            EngineKind::Docker,
            EngineVersion::new(24, 0, 0),
            DisabledFeatures::portable(),
        );
        let cmd = docker.build_command(Path::new("f"), "t", Path::new("."));
        assert!(cmd.get_env().is_empty());
    }

    #[test]
    fn test_podman_build_command_line() {
        let line = engine(EngineKind::Podman, 4).build_command_line(
            Path::new("Containerfile"),
            "web",
            Path::new("."),
        );
        assert_eq!(line, "podman build -f Containerfile -t web .");
    }

    #[test]
    fn test_tag_and_push_commands() {
        let podman = engine(EngineKind::Podman, 4);
        assert_eq!(
            podman.tag_command("web:1", "registry.io/web:1").to_string(),
            "podman tag web:1 registry.io/web:1"
        );
        assert_eq!(
            podman.push_command("registry.io/web:1").to_string(),
            "podman push registry.io/web:1"
        );
    }

    #[test]
    fn test_engine_kind_serde() {
        let kind: EngineKind = serde_json::from_str("\"podman\"").unwrap();
        assert_eq!(kind, EngineKind::Podman);
        assert_eq!(serde_json::to_string(&EngineKind::Docker).unwrap(), "\"docker\"");
    }

    #[test]
    fn test_parse_server_errors() {
        let errors = parse_server_errors(
            r#"{"ID":"","ServerErrors":["Cannot connect to the Docker daemon"]}"#,
        )
        .unwrap();
        assert_eq!(errors, vec!["Cannot connect to the Docker daemon"]);

        assert!(parse_server_errors(r#"{"ID":"abc","Containers":3}"#)
            .unwrap()
            .is_empty());
        assert!(parse_server_errors("").unwrap().is_empty());
        assert!(parse_server_errors("not json").is_err());
    }

    #[tokio::test]
    async fn test_detect_with_no_candidates() {
        assert!(ContainerEngine::detect_from(&[], DisabledFeatures::none())
            .await
            .is_none());
    }

    #[cfg(unix)]
    fn fake_engine(dir: &Path, name: &str, body: &str) {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_detect_prefers_podman() {
        let dir = tempfile::tempdir().unwrap();
        fake_engine(dir.path(), "podman", "echo 4.9.3");
        fake_engine(dir.path(), "docker", "echo 24.0.7");

        let engine =
            ContainerEngine::detect_in(&EngineKind::ALL, DisabledFeatures::none(), dir.path())
                .await
                .unwrap();
        assert_eq!(engine.kind(), EngineKind::Podman);
        assert_eq!(engine.version(), EngineVersion::new(4, 9, 3));
        assert!(engine.supports_cache_mount());
        assert_eq!(
            engine.tag_command("a", "b").program(),
            dir.path().join("podman").display().to_string()
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_detect_old_podman_has_no_cache_mounts() {
        let dir = tempfile::tempdir().unwrap();
        fake_engine(dir.path(), "podman", "echo 3.4.2");

        let engine =
            ContainerEngine::detect_in(&EngineKind::ALL, DisabledFeatures::none(), dir.path())
                .await
                .unwrap();
        assert_eq!(engine.kind(), EngineKind::Podman);
        assert_eq!(engine.version(), EngineVersion::new(3, 4, 2));
        assert!(!engine.supports_cache_mount());
        assert!(!engine.supports_cache_mount_selinux_relabeling());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_detect_docker_with_daemon_down() {
        let dir = tempfile::tempdir().unwrap();
        // Client version on stdout, daemon error on stderr, non-zero exit.
        fake_engine(
            dir.path(),
            "docker",
            "echo 24.0.7\necho 'Cannot connect to the Docker daemon' >&2\nexit 1",
        );

        let engine =
            ContainerEngine::detect_in(&EngineKind::ALL, DisabledFeatures::none(), dir.path())
                .await
                .unwrap();
        assert_eq!(engine.kind(), EngineKind::Docker);
        assert_eq!(engine.version(), EngineVersion::new(24, 0, 7));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_detect_skips_broken_engine() {
        let dir = tempfile::tempdir().unwrap();
        fake_engine(dir.path(), "podman", "echo 'no runtime' >&2\nexit 125");
        fake_engine(dir.path(), "docker", "echo 20.10.21");

        let engine =
            ContainerEngine::detect_in(&EngineKind::ALL, DisabledFeatures::none(), dir.path())
                .await
                .unwrap();
        assert_eq!(engine.kind(), EngineKind::Docker);

        assert!(ContainerEngine::detect_in(
            &[EngineKind::Podman],
            DisabledFeatures::none(),
            dir.path()
        )
        .await
        .is_none());
    }
}
