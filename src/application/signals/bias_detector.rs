use crate::domain::bias::{BiasFlag, BiasKind, BiasSeverity};

const RECENT_LOSS_THRESHOLD: f64 = 0.02;
const RECENT_LOSS_HIGH_THRESHOLD: f64 = 0.05;
const OVERCONFIDENCE_WIN_STREAK: usize = 5;
const OVERCONFIDENCE_HIGH_STREAK: usize = 8;
const MAX_POSITION_SIZE: f64 = 0.20;
const OVEREXPOSURE_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiasLabel {
    AvoidTrading,
    ReducePositionSize,
    Ok,
}

/// Behavioral input for a single bias check: recent trading history plus the
/// position this specific signal would take.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraderContext {
    pub recent_loss_fraction: f64,
    pub recent_wins: usize,
    pub current_allocation_pct: f64,
    pub recommended_allocation_pct: f64,
}

fn check_loss_aversion(ctx: &TraderContext) -> Option<BiasFlag> {
    if ctx.recent_loss_fraction > RECENT_LOSS_THRESHOLD {
        let severity = if ctx.recent_loss_fraction > RECENT_LOSS_HIGH_THRESHOLD {
            BiasSeverity::High
        } else {
            BiasSeverity::Medium
        };
        return Some(BiasFlag::new(
            BiasKind::LossAversion,
            severity,
            format!(
                "recent losses ({:.2}%) exceed the {:.2}% threshold",
                ctx.recent_loss_fraction * 100.0,
                RECENT_LOSS_THRESHOLD * 100.0
            ),
        ));
    }
    None
}

fn check_overconfidence_streak(ctx: &TraderContext) -> Option<BiasFlag> {
    if ctx.recent_wins >= OVERCONFIDENCE_WIN_STREAK {
        let severity = if ctx.recent_wins >= OVERCONFIDENCE_HIGH_STREAK {
            BiasSeverity::High
        } else {
            BiasSeverity::Medium
        };
        return Some(BiasFlag::new(
            BiasKind::Overconfidence,
            severity,
            format!("win streak of {} may indicate overconfidence", ctx.recent_wins),
        ));
    }
    None
}

fn check_position_sizing(ctx: &TraderContext) -> Vec<BiasFlag> {
    let mut flags = Vec::new();
    if ctx.current_allocation_pct > MAX_POSITION_SIZE {
        flags.push(BiasFlag::new(
            BiasKind::Anchoring,
            BiasSeverity::High,
            format!(
                "position size ({:.2}%) exceeds the {:.2}% maximum",
                ctx.current_allocation_pct * 100.0,
                MAX_POSITION_SIZE * 100.0
            ),
        ));
    } else if ctx.current_allocation_pct > ctx.recommended_allocation_pct * OVEREXPOSURE_MULTIPLIER {
        flags.push(BiasFlag::new(
            BiasKind::Overconfidence,
            BiasSeverity::Medium,
            format!(
                "position size ({:.2}%) significantly exceeds the recommended {:.2}%",
                ctx.current_allocation_pct * 100.0,
                ctx.recommended_allocation_pct * 100.0
            ),
        ));
    }
    flags
}

pub fn detect_all(ctx: &TraderContext) -> Vec<BiasFlag> {
    let mut flags = Vec::new();
    flags.extend(check_loss_aversion(ctx));
    flags.extend(check_overconfidence_streak(ctx));
    flags.extend(check_position_sizing(ctx));
    flags
}

/// Any high-severity flag means avoid; any remaining medium means reduce
/// size; otherwise the trader is clear to proceed.
pub fn overall_label(flags: &[BiasFlag]) -> BiasLabel {
    if flags.iter().any(|f| f.severity == BiasSeverity::High) {
        BiasLabel::AvoidTrading
    } else if flags.iter().any(|f| f.severity == BiasSeverity::Medium) {
        BiasLabel::ReducePositionSize
    } else {
        BiasLabel::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_recent_loss_does_not_trigger_a_flag() {
        let ctx = TraderContext {
            recent_loss_fraction: 0.01,
            ..Default::default()
        };
        assert!(detect_all(&ctx).is_empty());
    }

    #[test]
    fn large_recent_loss_triggers_high_severity() {
        let ctx = TraderContext {
            recent_loss_fraction: 0.06,
            ..Default::default()
        };
        let flags = detect_all(&ctx);
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].severity, BiasSeverity::High);
        assert_eq!(overall_label(&flags), BiasLabel::AvoidTrading);
    }

    #[test]
    fn oversized_position_is_always_high_severity() {
        let ctx = TraderContext {
            current_allocation_pct: 0.25,
            recommended_allocation_pct: 0.02,
            ..Default::default()
        };
        let flags = detect_all(&ctx);
        assert!(flags.iter().any(|f| f.kind == BiasKind::Anchoring && f.severity == BiasSeverity::High));
    }

    #[test]
    fn moderate_overexposure_without_breaching_the_cap_is_medium() {
        let ctx = TraderContext {
            current_allocation_pct: 0.05,
            recommended_allocation_pct: 0.02,
            ..Default::default()
        };
        let flags = detect_all(&ctx);
        assert_eq!(overall_label(&flags), BiasLabel::ReducePositionSize);
    }

    #[test]
    fn clean_context_yields_ok() {
        assert_eq!(overall_label(&[]), BiasLabel::Ok);
    }
}
