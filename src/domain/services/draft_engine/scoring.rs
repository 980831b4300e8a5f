//! Pure pick arithmetic: score adjustment and snake turn order.

use crate::domain::models::types::{MAX_ADJUSTABLE_SCORE, MIN_ADJUSTABLE_SCORE};

/// Adjustment applied to the adjustable score of the player taken with `pick_number` (1-based).
///
/// Picks 1 to 6 gain `20 - 2n`, picks 7 to 12 are unchanged and later picks lose `n - 8`.
pub fn pick_adjustment(pick_number: u32) -> i32 {
    let pick = i32::try_from(pick_number).unwrap_or(i32::MAX);
    match pick {
        i32::MIN..=6 => 20 - 2 * pick,
        7..=12 => 0,
        _ => 8i32.saturating_sub(pick),
    }
}

/// New adjustable score after applying the adjustment for `pick_number`, clamped to [10, 100].
pub fn adjusted_score(old_score: i32, pick_number: u32) -> i32 {
    old_score
        .saturating_add(pick_adjustment(pick_number))
        .clamp(MIN_ADJUSTABLE_SCORE, MAX_ADJUSTABLE_SCORE)
}

/// Index of the team on the clock after `total_drafted` picks, in snake order.
///
/// Even rounds run forward through the team list, odd rounds run backward. `None` when there
/// are no teams.
pub fn team_on_the_clock(total_drafted: u32, team_count: usize) -> Option<usize> {
    if team_count == 0 {
        return None;
    }
    let total = total_drafted as usize;
    let round = total / team_count;
    let position = total % team_count;
    if round % 2 == 0 {
        Some(position)
    } else {
        Some(team_count - 1 - position)
    }
}

/// 1-based round of the pick that follows `total_drafted` picks
pub fn current_round(total_drafted: u32, team_count: usize) -> u32 {
    if team_count == 0 {
        return 1;
    }
    (total_drafted as usize / team_count) as u32 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_table_from_a_start_of_fifty() {
        assert_eq!(adjusted_score(50, 1), 68);
        assert_eq!(adjusted_score(50, 6), 58);
        assert_eq!(adjusted_score(50, 7), 50);
        assert_eq!(adjusted_score(50, 12), 50);
        assert_eq!(adjusted_score(50, 13), 45);
        assert_eq!(adjusted_score(50, 18), 40);
    }

    #[test]
    fn adjustments_by_pick_band() {
        let early: Vec<i32> = (1..=6).map(pick_adjustment).collect();
        assert_eq!(early, vec![18, 16, 14, 12, 10, 8]);
        assert!((7..=12).all(|pick| pick_adjustment(pick) == 0));
        assert_eq!(pick_adjustment(13), -5);
        assert_eq!(pick_adjustment(100), -92);
    }

    #[test]
    fn adjusted_score_is_always_clamped() {
        assert_eq!(adjusted_score(95, 1), 100);
        assert_eq!(adjusted_score(12, 40), 10);
        assert_eq!(adjusted_score(i32::MAX, 1), 100);
        assert_eq!(adjusted_score(i32::MIN, 1), 10);
        assert_eq!(adjusted_score(-500, 9), 10);
        assert_eq!(adjusted_score(50, u32::MAX), 10);
    }

    #[test]
    fn snake_order_for_six_teams() {
        let order: Vec<usize> = (0..18)
            .map(|drafted| team_on_the_clock(drafted, 6).unwrap())
            .collect();
        assert_eq!(
            order,
            vec![0, 1, 2, 3, 4, 5, 5, 4, 3, 2, 1, 0, 0, 1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn rounds_are_one_based() {
        assert_eq!(current_round(0, 6), 1);
        assert_eq!(current_round(5, 6), 1);
        assert_eq!(current_round(6, 6), 2);
        assert_eq!(current_round(3, 0), 1);
        assert_eq!(team_on_the_clock(3, 0), None);
    }
}
