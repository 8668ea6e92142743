// src/handler/builtin.rs

//! Handlers for the resource types plan files can declare out of the box.

use std::process::Stdio;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::plan::PlanResource;
use crate::resource::{DeploymentContext, Resource};

use super::{HandlerError, ResourceHandler};

pub const COMMAND_TYPE: &str = "command";
pub const SLEEP_TYPE: &str = "sleep";

fn plan_resource<'a>(
    resource: &'a dyn Resource,
    handler: &str,
) -> Result<&'a PlanResource, HandlerError> {
    resource
        .as_any()
        .downcast_ref::<PlanResource>()
        .ok_or_else(|| {
            HandlerError::Failed(anyhow!(
                "{handler} handler cannot apply resource '{}': not declared in a plan file",
                resource.key()
            ))
        })
}

/// Runs `cmd` through the platform shell; a non-zero exit fails the resource.
///
/// The child is killed if the run is cancelled while it is still running.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandHandler;

#[async_trait]
impl ResourceHandler for CommandHandler {
    fn resource_type(&self) -> &str {
        COMMAND_TYPE
    }

    async fn apply(
        &self,
        _context: &DeploymentContext,
        resource: &dyn Resource,
        cancel: &CancellationToken,
    ) -> Result<(), HandlerError> {
        let plan = plan_resource(resource, COMMAND_TYPE)?;
        let command = plan
            .cmd()
            .ok_or_else(|| anyhow!("resource '{}' has no `cmd`", resource.key()))?;

        if cancel.is_cancelled() {
            return Err(HandlerError::Cancelled);
        }

        let key = resource.key().to_string();
        info!(resource = %key, cmd = %command, "starting command");

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(command);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(command);
            c
        };

        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process for resource '{key}'"))?;

        if let Some(stdout) = child.stdout.take() {
            let key = key.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    info!(resource = %key, "stdout: {}", line);
                }
            });
        }
        if let Some(stderr) = child.stderr.take() {
            let key = key.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(resource = %key, "stderr: {}", line);
                }
            });
        }

        tokio::select! {
            status = child.wait() => {
                let status = status
                    .with_context(|| format!("waiting for process of resource '{key}'"))?;
                let code = status.code().unwrap_or(-1);
                info!(resource = %key, exit_code = code, success = status.success(), "command exited");

                if status.success() {
                    Ok(())
                } else {
                    Err(HandlerError::Failed(anyhow!(
                        "command for resource '{key}' exited with code {code}"
                    )))
                }
            }
            _ = cancel.cancelled() => {
                info!(resource = %key, "cancellation requested; killing command");
                if let Err(e) = child.kill().await {
                    warn!(resource = %key, error = %e, "failed to kill command on cancellation");
                }
                Err(HandlerError::Cancelled)
            }
        }
    }
}

/// Waits for `duration_ms`. Useful as a placeholder or for pacing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepHandler;

#[async_trait]
impl ResourceHandler for SleepHandler {
    fn resource_type(&self) -> &str {
        SLEEP_TYPE
    }

    async fn apply(
        &self,
        _context: &DeploymentContext,
        resource: &dyn Resource,
        cancel: &CancellationToken,
    ) -> Result<(), HandlerError> {
        let plan = plan_resource(resource, SLEEP_TYPE)?;
        let duration = plan
            .duration()
            .ok_or_else(|| anyhow!("resource '{}' has no `duration_ms`", resource.key()))?;

        debug!(resource = %resource.key(), ?duration, "sleeping");
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = cancel.cancelled() => Err(HandlerError::Cancelled),
        }
    }
}
