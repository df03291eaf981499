#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_display_plain_arguments() {
        let cmd = ProcessCommand::new("docker")
            .args(["build", "-f", "Containerfile.abc", "-t", "web:latest", "."]);
        assert_eq!(
            cmd.to_string(),
            "docker build -f Containerfile.abc -t web:latest ."
        );
    }

    #[test]
    fn test_display_env_and_quoting() {
        let cmd = ProcessCommand::new("docker")
            .arg("build")
            .arg("/path with space")
            .arg("it's")
            .arg("")
            .env("DOCKER_BUILDKIT", "1");
        assert_eq!(
            cmd.to_string(),
            r"DOCKER_BUILDKIT=1 docker build '/path with space' 'it'\''s' ''"
        );
    }

    #[test]
    fn test_builder_accessors() {
        let cmd = ProcessCommand::new("podman")
            .args(["push", "web"])
            .env("A", "1");
        assert_eq!(cmd.program(), "podman");
        assert_eq!(cmd.get_args(), ["push", "web"]);
        assert_eq!(cmd.get_env(), [("A".to_string(), "1".to_string())]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_output_captures_both_streams() {
        let cmd = ProcessCommand::new("sh")
            .arg("-c")
            .arg("echo one; echo two; echo oops >&2; exit 3");
        let output = cmd.output().await.unwrap();
        assert_eq!(output.exit_code, 3);
        assert!(!output.success());
        assert_eq!(output.stdout, "one\ntwo");
        assert_eq!(output.stderr, "oops");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_with_streams_lines_in_order() {
        let cmd = ProcessCommand::new("sh").arg("-c").arg("for i in 1 2 3; do echo $i; done");
        let mut seen = Vec::new();
        let code = cmd.execute_with(|line| seen.push(line)).await.unwrap();
        assert_eq!(code, 0);
        assert_eq!(
            seen,
            vec![
                OutputLine::Stdout("1".to_string()),
                OutputLine::Stdout("2".to_string()),
                OutputLine::Stdout("3".to_string()),
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_env_override_reaches_child() {
        let cmd = ProcessCommand::new("sh")
            .arg("-c")
            .arg("echo $BUILD_IMAGE_TEST_VAR")
            .env("BUILD_IMAGE_TEST_VAR", "hello");
        let output = cmd.output().await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdin_is_closed() {
        // `cat` exits straight away when stdin is at end of file.
        let output = ProcessCommand::new("cat").output().await.unwrap();
        assert!(output.success());
        assert!(output.stdout.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_output_keeps_streaming() {
        let script = r#"printf 'before\n\377\n'
sleep 0.2
i=1
while [ $i -le 2000 ]; do echo after$i; i=$((i+1)); done
echo done >&2"#;
        let output = ProcessCommand::new("sh")
            .arg("-c")
            .arg(script)
            .output()
            .await
            .unwrap();

        assert_eq!(output.exit_code, 0);
        let lines: Vec<&str> = output.stdout.lines().collect();
        assert_eq!(lines.len(), 2002);
        assert_eq!(lines[0], "before");
        assert_eq!(lines[1], "\u{FFFD}");
        assert_eq!(lines[2001], "after2000");
        assert_eq!(output.stderr, "done");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_crlf_and_unterminated_lines() {
        let output = ProcessCommand::new("sh")
            .arg("-c")
            .arg(r"printf 'one\r\ntwo'")
            .output()
            .await
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, "one\ntwo");
    }

    #[tokio::test]
    async fn test_missing_program_is_an_error() {
        let result = ProcessCommand::new("build-image-no-such-program")
            .output()
            .await;
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("build-image-no-such-program"));
    }
}
