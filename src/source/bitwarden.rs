//! Bitwarden source - drives the `bw` command line client.

use super::{Session, SourceStore};
use crate::error::{Error, Result};
use crate::process::{Invocation, ProcessRunner};
use std::time::{Duration, Instant};

/// Default binary name
pub const DEFAULT_PROGRAM: &str = "bw";

/// Bounds on how long `unlock` keeps asking for the master password
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnlockPolicy {
    pub max_attempts: u32,
    pub timeout: Duration,
    pub retry_delay: Duration,
}

impl Default for UnlockPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            timeout: Duration::from_secs(300),
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Bitwarden CLI client
pub struct BitwardenCli<R> {
    runner: R,
    program: String,
    policy: UnlockPolicy,
    /// Pre-existing session (e.g. from `BW_SESSION`); skips unlocking
    preset_session: Option<Session>,
    log_commands: bool,
}

impl<R: ProcessRunner> BitwardenCli<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            program: DEFAULT_PROGRAM.to_string(),
            policy: UnlockPolicy::default(),
            preset_session: None,
            log_commands: true,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_policy(mut self, policy: UnlockPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_session(mut self, session: Option<Session>) -> Self {
        self.preset_session = session;
        self
    }

    pub fn with_logging(mut self, log_commands: bool) -> Self {
        self.log_commands = log_commands;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn policy(&self) -> UnlockPolicy {
        self.policy
    }

    fn command(&self) -> Invocation {
        Invocation::new(&self.program).with_logging(self.log_commands)
    }

    fn session_command(&self, session: &Session) -> Invocation {
        self.command().arg("--session").secret_arg(session.token())
    }
}

impl<R: ProcessRunner> SourceStore for BitwardenCli<R> {
    fn unlock(&self) -> Result<Session> {
        if let Some(session) = &self.preset_session {
            tracing::info!("Using existing Bitwarden session");
            return Ok(session.clone());
        }

        let invocation = self.command().arg("unlock").arg("--raw").interactive();
        let started = Instant::now();
        let mut attempts = 0;

        loop {
            attempts += 1;

            // Spawn failures are fatal; only the tool's own refusals are retried
            let output = self.runner.run(&invocation)?;
            let token = output.stdout.trim();
            if output.success && !token.is_empty() {
                return Ok(Session::new(token));
            }

            if output.success {
                tracing::warn!("Unlock attempt {} returned no session token", attempts);
            } else {
                tracing::warn!("Unlock attempt {} failed ({})", attempts, output.status);
            }

            let elapsed = started.elapsed();
            if attempts >= self.policy.max_attempts || elapsed >= self.policy.timeout {
                return Err(Error::UnlockTimedOut {
                    attempts,
                    elapsed_secs: elapsed.as_secs(),
                });
            }

            std::thread::sleep(self.policy.retry_delay);
        }
    }

    fn sync(&self, session: &Session) -> Result<()> {
        let invocation = self.session_command(session).arg("sync");
        self.runner.run_checked(&invocation)?;
        Ok(())
    }

    fn list_items(&self, session: &Session) -> Result<String> {
        let invocation = self.session_command(session).arg("list").arg("items");
        Ok(self.runner.run_checked(&invocation)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{CommandOutput, ProcessError};
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned outputs and records every invocation
    #[derive(Default)]
    struct ScriptedRunner {
        outputs: RefCell<VecDeque<CommandOutput>>,
        calls: RefCell<Vec<Invocation>>,
    }

    impl ScriptedRunner {
        fn with(outputs: Vec<CommandOutput>) -> Self {
            Self {
                outputs: RefCell::new(outputs.into()),
                calls: RefCell::default(),
            }
        }
    }

    impl ProcessRunner for ScriptedRunner {
        fn run(&self, invocation: &Invocation) -> std::result::Result<CommandOutput, ProcessError> {
            self.calls.borrow_mut().push(invocation.clone());
            Ok(self
                .outputs
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| CommandOutput::ok("")))
        }
    }

    fn fast_policy(max_attempts: u32) -> UnlockPolicy {
        UnlockPolicy {
            max_attempts,
            timeout: Duration::from_secs(60),
            retry_delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_unlock_retries_until_token() -> anyhow::Result<()> {
        let runner = ScriptedRunner::with(vec![
            CommandOutput::failed(1, "Invalid master password."),
            CommandOutput::ok(""),
            CommandOutput::ok("dG9rZW4=\n"),
        ]);
        let bw = BitwardenCli::new(&runner).with_policy(fast_policy(5));

        let session = bw.unlock()?;
        assert_eq!(session.token(), "dG9rZW4=");

        let calls = runner.calls.borrow();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].program, "bw");
        assert_eq!(calls[0].args, vec!["unlock", "--raw"]);
        assert!(calls[0].interactive);
        Ok(())
    }

    #[test]
    fn test_unlock_gives_up_after_max_attempts() {
        let runner = ScriptedRunner::with(vec![
            CommandOutput::failed(1, "no"),
            CommandOutput::failed(1, "no"),
            CommandOutput::failed(1, "no"),
        ]);
        let bw = BitwardenCli::new(&runner).with_policy(fast_policy(2));

        match bw.unlock() {
            Err(Error::UnlockTimedOut { attempts, .. }) => assert_eq!(attempts, 2),
            other => panic!("expected UnlockTimedOut, got {:?}", other),
        }
        assert_eq!(runner.calls.borrow().len(), 2);
    }

    #[test]
    fn test_unlock_stops_at_timeout() {
        let runner = ScriptedRunner::with(vec![CommandOutput::ok("")]);
        let policy = UnlockPolicy {
            max_attempts: 100,
            timeout: Duration::ZERO,
            retry_delay: Duration::ZERO,
        };
        let bw = BitwardenCli::new(&runner).with_policy(policy);

        assert!(matches!(
            bw.unlock(),
            Err(Error::UnlockTimedOut { attempts: 1, .. })
        ));
    }

    #[test]
    fn test_preset_session_skips_unlock() -> anyhow::Result<()> {
        let runner = ScriptedRunner::default();
        let bw = BitwardenCli::new(&runner).with_session(Some(Session::new("preset")));

        assert_eq!(bw.unlock()?.token(), "preset");
        assert!(runner.calls.borrow().is_empty());
        Ok(())
    }

    #[test]
    fn test_sync_and_list_pass_session() -> anyhow::Result<()> {
        let runner = ScriptedRunner::with(vec![
            CommandOutput::ok("Syncing complete."),
            CommandOutput::ok("[]"),
        ]);
        let bw = BitwardenCli::new(&runner).with_program("/opt/bw");
        let session = Session::new("tok");

        bw.sync(&session)?;
        assert_eq!(bw.list_items(&session)?, "[]");

        let calls = runner.calls.borrow();
        assert_eq!(calls[0].program, "/opt/bw");
        assert_eq!(calls[0].args, vec!["--session", "tok", "sync"]);
        assert_eq!(calls[0].display(), "/opt/bw --session *** sync");
        assert_eq!(calls[1].args, vec!["--session", "tok", "list", "items"]);
        Ok(())
    }

    #[test]
    fn test_list_items_surfaces_exit_status() {
        let runner = ScriptedRunner::with(vec![CommandOutput::failed(1, "You are not logged in.")]);
        let bw = BitwardenCli::new(&runner);

        let err = bw.list_items(&Session::new("tok")).unwrap_err();
        assert!(matches!(err, Error::Process(ProcessError::Failed { .. })));
        assert!(err.to_string().contains("You are not logged in."));
    }
}
