use clap::{Args, Subcommand};
use fitquest_core::{CounterRemote, CounterResource};

use super::tracker::{progress_bar, summary_line, CommandContext, CommandError, CounterSession};

const BAR_WIDTH: usize = 20;

/// Track daily step count
#[derive(Debug, Args)]
pub struct StepsCommand {
    #[command(subcommand)]
    pub command: Option<StepsSubcommand>,
}

#[derive(Debug, Subcommand)]
pub enum StepsSubcommand {
    /// Show today's steps
    Show,

    /// Add steps to today's count
    Add { count: u32 },

    /// Set today's step count
    Set {
        #[arg(allow_negative_numbers = true)]
        count: i64,
    },

    /// Set the daily step goal
    Goal {
        #[arg(allow_negative_numbers = true)]
        target: i64,
    },
}

impl StepsCommand {
    pub async fn run(&self, ctx: &CommandContext<'_>) -> Result<(), CommandError> {
        let mut session = CounterSession::open(CounterResource::Steps, ctx).await?;
        self.execute(&mut session, ctx).await
    }

    async fn execute<R: CounterRemote>(
        &self,
        session: &mut CounterSession<'_, R>,
        ctx: &CommandContext<'_>,
    ) -> Result<(), CommandError> {
        let before = session.state();

        let result = match &self.command {
            None | Some(StepsSubcommand::Show) => None,
            Some(StepsSubcommand::Add { count }) => {
                Some(session.engine.adjust_count(i64::from(*count)).await)
            }
            Some(StepsSubcommand::Set { count }) => {
                Some(session.engine.request_set_count(*count).await)
            }
            Some(StepsSubcommand::Goal { target }) => {
                Some(session.engine.request_set_target(*target).await)
            }
        };

        if let Some(result) = result {
            session.finish(before, result)?;
        }

        let state = session.state();
        println!("{}", summary_line(CounterResource::Steps, ctx.date, &state));
        println!("{}", progress_bar(&state, BAR_WIDTH));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::cues::SilentCues;
    use chrono::NaiveDate;
    use fitquest_core::{CounterState, CounterSync, MockRemote, RemoteCall};
    use tempfile::tempdir;

    const STEPS: CounterResource = CounterResource::Steps;

    async fn run_with(remote: MockRemote, command: StepsSubcommand) -> Result<(), CommandError> {
        let temp_dir = tempdir().unwrap();
        let config = Config::load(Some(temp_dir.path().join("none.yaml"))).unwrap();
        let cues = SilentCues;
        let ctx = CommandContext {
            config: &config,
            date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            cues: &cues,
        };
        let mut session = CounterSession::load(CounterSync::new(STEPS, remote), &cues).await?;
        StepsCommand {
            command: Some(command),
        }
        .execute(&mut session, &ctx)
        .await
    }

    #[tokio::test]
    async fn test_add_uses_absolute_set() {
        let remote = MockRemote::new().with_state(STEPS, CounterState::new(1000, 8000));

        run_with(remote.clone(), StepsSubcommand::Add { count: 2500 })
            .await
            .unwrap();

        assert_eq!(remote.mutations(), vec![RemoteCall::SetCount(STEPS, 3500)]);
    }

    #[tokio::test]
    async fn test_set_without_endpoint_is_not_an_error() {
        let remote = MockRemote::new()
            .with_state(STEPS, CounterState::new(1000, 8000))
            .without_set_count();

        assert!(run_with(remote.clone(), StepsSubcommand::Set { count: 4000 })
            .await
            .is_ok());
        assert_eq!(remote.state(STEPS).current, 1000);
    }

    #[tokio::test]
    async fn test_negative_goal_rejected() {
        let remote = MockRemote::new();

        let err = run_with(remote.clone(), StepsSubcommand::Goal { target: -10 })
            .await
            .unwrap_err();

        assert!(matches!(err, CommandError::Sync(_)));
        assert!(remote.mutations().is_empty());
    }
}
