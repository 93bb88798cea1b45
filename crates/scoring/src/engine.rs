//! Score engine
//!
//! Trust score = individual score outside an active circle, otherwise a
//! 60/40 blend of the individual score and the circle average. All division
//! is integer floor division.

use trustcircle_core::Score;

/// Weight of the individual score in the blend (percent)
pub const INDIVIDUAL_WEIGHT: u32 = 60;

/// Weight of the circle average in the blend (percent)
pub const CIRCLE_WEIGHT: u32 = 40;

/// Score read in place of a stored 0 when averaging a circle.
///
/// A stored 0 is treated as "never initialized". This also catches members
/// who were driven to 0 by penalties, which is intentional compatibility
/// behavior: their contribution to the circle average reads as 50.
const UNINITIALIZED_FALLBACK: Score = Score::INITIAL;

/// Stateless trust score calculator
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreEngine;

impl ScoreEngine {
    /// Floor mean of member scores. An empty circle averages 50.
    pub fn circle_average<I>(scores: I) -> Score
    where
        I: IntoIterator<Item = Score>,
    {
        let (sum, count) = scores.into_iter().fold((0u32, 0u32), |(sum, count), s| {
            let s = if s == Score::MIN {
                UNINITIALIZED_FALLBACK
            } else {
                s
            };
            (sum + s.value(), count + 1)
        });

        if count == 0 {
            return UNINITIALIZED_FALLBACK;
        }
        Score::clamped((sum / count) as i64)
    }

    /// `floor((individual * 60 + circle_average * 40) / 100)`
    pub fn blend(individual: Score, circle_average: Score) -> Score {
        let weighted =
            individual.value() * INDIVIDUAL_WEIGHT + circle_average.value() * CIRCLE_WEIGHT;
        Score::clamped((weighted / 100) as i64)
    }

    /// Score used for credit decisions.
    ///
    /// `active_circle_average` is `None` when the member has no circle or the
    /// circle has not activated yet.
    pub fn trust_score(individual: Score, active_circle_average: Option<Score>) -> Score {
        match active_circle_average {
            Some(average) => Self::blend(individual, average),
            None => individual,
        }
    }

    /// Additive adjustment clamped to `[0, 100]`
    pub fn adjust(score: Score, delta: i32) -> Score {
        score.saturating_adjust(delta)
    }
}
