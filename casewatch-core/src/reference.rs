//! Static reference data for comparison charts.

use serde::Serialize;

/// Annual US deaths attributed to one leading cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CauseOfDeath {
    pub cause: &'static str,
    pub deaths: u64,
}

pub const ALL_OTHER_CAUSES: &str = "All Other Causes";

// Annual US deaths by leading cause (CDC, 2017).
const LEADING_CAUSES: [CauseOfDeath; 11] = [
    CauseOfDeath { cause: "Heart Disease", deaths: 647_457 },
    CauseOfDeath { cause: "Cancer", deaths: 599_108 },
    CauseOfDeath { cause: "Accidents", deaths: 169_936 },
    CauseOfDeath { cause: "CLRD", deaths: 160_201 },
    CauseOfDeath { cause: "Stroke", deaths: 146_383 },
    CauseOfDeath { cause: "Alzheimer", deaths: 121_404 },
    CauseOfDeath { cause: "Diabetes", deaths: 83_564 },
    CauseOfDeath { cause: "Flu&Pneumonia", deaths: 55_672 },
    CauseOfDeath { cause: "Kidney Disease", deaths: 50_633 },
    CauseOfDeath { cause: "Suicide", deaths: 47_173 },
    CauseOfDeath { cause: ALL_OTHER_CAUSES, deaths: 731_972 },
];

/// Leading causes in descending order, with the catch-all bucket last.
pub fn causes_of_death() -> Vec<CauseOfDeath> {
    let mut causes: Vec<CauseOfDeath> = LEADING_CAUSES
        .iter()
        .copied()
        .filter(|c| c.cause != ALL_OTHER_CAUSES)
        .collect();
    causes.sort_by(|a, b| b.deaths.cmp(&a.deaths));
    causes.extend(LEADING_CAUSES.iter().copied().filter(|c| c.cause == ALL_OTHER_CAUSES));
    causes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descending_with_catch_all_last() {
        let causes = causes_of_death();
        assert_eq!(causes.len(), 11);
        assert_eq!(causes[0].cause, "Heart Disease");
        assert_eq!(causes.last().unwrap().cause, ALL_OTHER_CAUSES);

        let named = &causes[..causes.len() - 1];
        assert!(named.windows(2).all(|w| w[0].deaths >= w[1].deaths));
    }
}
