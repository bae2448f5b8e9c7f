// Docker-backed sandbox using Bollard
use crate::engine::{OutputBuffer, RawRun, SandboxEngine};
use anyhow::{Context, Result};
use async_trait::async_trait;
use autosolve_common::config::SandboxConfig;
use base64::{engine::general_purpose, Engine as _};
use bollard::container::{
    Config, CreateContainerOptions, KillContainerOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, WaitContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::Docker;
use futures_util::stream::StreamExt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const WORK_DIR: &str = "/tmp";
const PIDS_LIMIT: i64 = 64;

/// Force-removes the container when dropped, including on panic or cancellation
struct ContainerGuard<'a> {
    docker: &'a Docker,
    container_id: String,
}

impl<'a> ContainerGuard<'a> {
    fn new(docker: &'a Docker, container_id: String) -> Self {
        Self { docker, container_id }
    }
}

impl<'a> Drop for ContainerGuard<'a> {
    fn drop(&mut self) {
        // Drop cannot be async; removal runs on the runtime in the background
        let container_id = self.container_id.clone();
        let docker = self.docker.clone();

        tokio::spawn(async move {
            let remove_options = RemoveContainerOptions {
                force: true,
                ..Default::default()
            };

            if let Err(e) = docker.remove_container(&container_id, Some(remove_options)).await {
                warn!(container_id = %container_id, error = %e, "Failed to clean up container");
            }
        });
    }
}

/// Docker-based sandbox: one throwaway container per program
///
/// **Container Rules:**
/// 1. Pulls the configured image if not present
/// 2. Network disabled, memory/CPU/pid limits, all capabilities dropped
/// 3. Source injected through a base64 environment variable
/// 4. stdout/stderr collected from the log stream in arrival order
/// 5. Hard timeout, container killed on expiry
/// 6. Container removed afterwards via guard
pub struct DockerEngine {
    docker: Docker,
    config: SandboxConfig,
}

impl DockerEngine {
    pub fn new(config: SandboxConfig) -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .context("Failed to connect to Docker daemon")?;
        Ok(Self { docker, config })
    }

    /// Shell command that decodes the program into the work dir and runs it
    fn launch_command(&self) -> Vec<String> {
        let path = format!("{}/{}", WORK_DIR, self.config.file_name);
        let script = format!(
            "printf '%s' \"$SOURCE_CODE\" | base64 -d > {path} && exec {} {path}",
            self.config.interpreter.join(" ")
        );
        vec!["sh".to_string(), "-c".to_string(), script]
    }

    fn memory_limit_bytes(&self) -> i64 {
        (self.config.memory_limit_mb as i64) * 1024 * 1024
    }

    fn nano_cpus(&self) -> i64 {
        (self.config.cpu_limit as f64 * 1_000_000_000.0) as i64
    }

    /// Ensure Docker image is available (pull if needed)
    async fn ensure_image(&self, image: &str) -> Result<()> {
        if self.docker.inspect_image(image).await.is_ok() {
            debug!(image = %image, "Image cache hit");
            return Ok(());
        }

        warn!(image = %image, "Image cache miss, pulling");

        let options = Some(CreateImageOptions {
            from_image: image,
            ..Default::default()
        });

        let mut stream = self.docker.create_image(options, None, None);
        while let Some(result) = stream.next().await {
            result.context("Failed to pull Docker image")?;
        }

        info!(image = %image, "Image pulled");
        Ok(())
    }
}

#[async_trait]
impl SandboxEngine for DockerEngine {
    async fn run(&self, code: &str) -> Result<RawRun> {
        let image = self.config.image.clone();
        self.ensure_image(&image)
            .await
            .with_context(|| format!("Failed to ensure Docker image '{}' is available", image))?;

        let container_name = format!("autosolve-{}", uuid::Uuid::new_v4());

        let config = Config {
            image: Some(image.clone()),
            cmd: Some(self.launch_command()),
            entrypoint: Some(vec![]),
            env: Some(vec![format!(
                "SOURCE_CODE={}",
                general_purpose::STANDARD.encode(code)
            )]),
            working_dir: Some(WORK_DIR.to_string()),
            attach_stdin: Some(false),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            tty: Some(false),
            network_disabled: Some(true),
            host_config: Some(bollard::models::HostConfig {
                memory: Some(self.memory_limit_bytes()),
                memory_swap: Some(self.memory_limit_bytes()),
                nano_cpus: Some(self.nano_cpus()),
                pids_limit: Some(PIDS_LIMIT),
                cap_drop: Some(vec!["ALL".to_string()]),
                security_opt: Some(vec!["no-new-privileges".to_string()]),
                network_mode: Some("none".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let create_options = CreateContainerOptions {
            name: container_name.as_str(),
            platform: None,
        };

        let container = self
            .docker
            .create_container(Some(create_options), config)
            .await
            .context("Failed to create Docker container")?;

        let container_id = container.id.clone();
        let _guard = ContainerGuard::new(&self.docker, container_id.clone());

        let start_time = Instant::now();

        self.docker
            .start_container(&container_id, None::<StartContainerOptions<String>>)
            .await
            .context("Failed to start Docker container")?;

        let mut buffer = OutputBuffer::new(self.config.max_output_bytes);

        let execution_future = async {
            let logs_options = Some(LogsOptions::<String> {
                stdout: true,
                stderr: true,
                follow: true,
                ..Default::default()
            });

            let mut logs_stream = self.docker.logs(&container_id, logs_options);
            while let Some(output) = logs_stream.next().await {
                match output {
                    Ok(LogOutput::StdOut { message }) | Ok(LogOutput::StdErr { message }) => {
                        buffer.push(&message);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(container_id = %container_id, error = %e, "Error reading container logs");
                        break;
                    }
                }
            }

            let wait_options = WaitContainerOptions {
                condition: "not-running",
            };

            let mut wait_stream = self.docker.wait_container(&container_id, Some(wait_options));
            match wait_stream.next().await {
                Some(Ok(response)) => Some(response.status_code),
                // Bollard reports a non-zero exit as an error carrying the code
                Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => Some(code),
                Some(Err(e)) => {
                    warn!(container_id = %container_id, error = %e, "Failed to get container exit code");
                    None
                }
                None => None,
            }
        };

        let timeout_duration = Duration::from_millis(self.config.timeout_ms);
        let timeout_result = tokio::time::timeout(timeout_duration, execution_future).await;

        let (exit_code, timed_out) = match timeout_result {
            Ok(code) => (code, false),
            Err(_) => {
                warn!(
                    container_id = %container_id,
                    timeout_ms = self.config.timeout_ms,
                    "Execution timed out, killing container"
                );
                if let Err(e) = self
                    .docker
                    .kill_container(&container_id, None::<KillContainerOptions<String>>)
                    .await
                {
                    warn!(container_id = %container_id, error = %e, "Failed to kill timed-out container");
                }
                (None, true)
            }
        };

        let execution_time_ms = start_time.elapsed().as_millis() as u64;
        let (output, truncated) = buffer.into_string();

        // OOM kills surface as 137
        let output = if exit_code == Some(137) {
            format!("{}\n[Container killed: likely exceeded memory limit]", output)
        } else {
            output
        };

        Ok(RawRun {
            output,
            exit_code,
            timed_out,
            truncated,
            execution_time_ms,
        })
    }

    fn name(&self) -> &'static str {
        "docker"
    }
}
