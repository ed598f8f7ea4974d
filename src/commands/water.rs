//! Hydration commands: the glass row.

use clap::{Args, Subcommand};
use fitquest_core::{CounterRemote, CounterResource, CounterState, GlassRack};
use tokio::time::Instant;

use super::tracker::{summary_line, Change, CommandContext, CommandError, CounterSession};

/// Track glasses of water
#[derive(Debug, Args)]
pub struct WaterCommand {
    #[command(subcommand)]
    pub command: Option<WaterSubcommand>,

    /// Print the final row only, without waiting for glasses to settle
    #[arg(long, global = true)]
    pub no_animate: bool,
}

#[derive(Debug, Subcommand)]
pub enum WaterSubcommand {
    /// Show today's glasses
    Show,

    /// Drink one or more glasses
    Add {
        #[arg(default_value_t = 1)]
        count: u32,
    },

    /// Take back one or more glasses
    Remove {
        #[arg(default_value_t = 1)]
        count: u32,
    },

    /// Set the number of glasses drunk
    Set {
        #[arg(allow_negative_numbers = true)]
        count: i64,
    },

    /// Click a shown glass (numbered from 1): fills up to it, or empties from it
    Toggle { glass: u32 },

    /// Set the daily goal in glasses
    Goal {
        #[arg(allow_negative_numbers = true)]
        target: i64,
    },
}

impl WaterCommand {
    pub async fn run(&self, ctx: &CommandContext<'_>) -> Result<(), CommandError> {
        let mut session = CounterSession::open(CounterResource::Hydration, ctx).await?;
        self.execute(&mut session, ctx).await
    }

    async fn execute<R: CounterRemote>(
        &self,
        session: &mut CounterSession<'_, R>,
        ctx: &CommandContext<'_>,
    ) -> Result<(), CommandError> {
        let before = session.state();
        let mut rack = GlassRack::new(
            &before,
            ctx.config.max_glasses.value,
            ctx.config.glass_delay(),
        );

        let change = match &self.command {
            None | Some(WaterSubcommand::Show) => {
                print_row(ctx, &before, &rack);
                return Ok(());
            }
            Some(WaterSubcommand::Add { count }) => Change::Adjust(i64::from(*count)),
            Some(WaterSubcommand::Remove { count }) => Change::Adjust(-i64::from(*count)),
            Some(WaterSubcommand::Set { count }) => Change::SetCount(*count),
            Some(WaterSubcommand::Toggle { glass }) => {
                // Only glasses on screen can be clicked.
                match glass.checked_sub(1) {
                    Some(index) if (index as usize) < rack.len() => Change::Toggle(index),
                    _ => return Err(CommandError::InvalidSlot(*glass)),
                }
            }
            Some(WaterSubcommand::Goal { target }) => Change::SetTarget(*target),
        };

        let mut shown = None;
        let result = session
            .apply(change, |state| {
                rack.update(&state, Instant::now());
                print_row(ctx, &state, &rack);
                shown = Some(state);
            })
            .await;
        session.finish(before, result)?;

        // A failed change snaps back to the value held before it.
        let after = session.state();
        if shown != Some(after) {
            rack.update(&after, Instant::now());
            print_row(ctx, &after, &rack);
        }

        if !self.no_animate && !rack.is_settled() {
            rack.settle().await;
            println!("{}", rack.render());
        }

        Ok(())
    }
}

fn print_row(ctx: &CommandContext<'_>, state: &CounterState, rack: &GlassRack) {
    println!("{}", summary_line(CounterResource::Hydration, ctx.date, state));
    if !rack.is_empty() {
        println!("{}", rack.render());
    }
    if state.current > rack.len() as u32 {
        println!("(+{} more)", state.current - rack.len() as u32);
    }
}
