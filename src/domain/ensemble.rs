//! Majority-vote consensus across strategy signals.

use chrono::NaiveDateTime;

use super::signal::{Direction, Signal, SignalSource};
use super::strategy::StrategyKind;

/// Reduce one bar's strategy signals to a consensus signal.
///
/// HOLD inputs are ignored. The winning direction must hold a strict majority
/// (> 50%) of the remaining active signals; anything else, ties included, is
/// HOLD. Confidence is the winning share of active signals.
pub fn vote(symbol: &str, timestamp: NaiveDateTime, signals: &[Signal]) -> Signal {
    let mut active: Vec<&Signal> = signals
        .iter()
        .filter(|s| s.direction.is_actionable())
        .collect();

    if active.is_empty() {
        return Signal::hold(symbol, timestamp, SignalSource::Ensemble, "no active strategies");
    }

    active.sort_by_key(|s| priority(s.source));

    let buys = active.iter().filter(|s| s.direction == Direction::Buy).count();
    let sells = active.len() - buys;
    let total = active.len();

    let winner = if buys * 2 > total {
        Direction::Buy
    } else if sells * 2 > total {
        Direction::Sell
    } else {
        return Signal::hold(
            symbol,
            timestamp,
            SignalSource::Ensemble,
            format!(
                "no consensus (buy {}, sell {}): {}",
                buys,
                sells,
                join_reasons(active.iter().copied())
            ),
        );
    };

    let votes = if winner == Direction::Buy { buys } else { sells };
    let reason = join_reasons(active.iter().copied().filter(|s| s.direction == winner));

    Signal::new(
        symbol,
        timestamp,
        SignalSource::Ensemble,
        winner,
        votes as f64 / total as f64,
        reason,
    )
}

fn priority(source: SignalSource) -> (usize, Option<StrategyKind>) {
    match source {
        SignalSource::Strategy(kind) => (0, Some(kind)),
        SignalSource::Ensemble => (1, None),
    }
}

fn join_reasons<'a>(signals: impl Iterator<Item = &'a Signal>) -> String {
    signals
        .map(|s| format!("{}: {}", s.source, s.reason))
        .collect::<Vec<_>>()
        .join("; ")
}
