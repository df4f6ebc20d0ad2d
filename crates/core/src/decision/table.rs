use rand::Rng;

use crate::decision::path::{BranchPath, BranchToken};
use crate::decision::states::{DecisionOutcome, DecisionSettings, DecisionState, NextAction};
use crate::domain::filter::WineFilter;

/// Evaluates one conversation turn.
///
/// Deterministic except for the documented `CompletePrimaryOther` coin flip;
/// the randomness source is injected so tests can force either arm. Returns
/// an empty path with a fallback recommendation when no branch matches,
/// which callers log as an anomaly and do not record.
pub fn decide<R: Rng + ?Sized>(
    filter: &WineFilter,
    previous: Option<&BranchPath>,
    settings: &DecisionSettings,
    rng: &mut R,
) -> DecisionOutcome {
    let Some(state) = resolve_state(filter, previous, settings) else {
        return DecisionOutcome { action: NextAction::Recommendation, path: BranchPath::new() };
    };

    let previous_last = previous.and_then(BranchPath::last);
    transition(state, previous_last, filter, rng)
}

/// Picks the branch for this turn.
///
/// The name override outranks everything. Otherwise a live (non-terminated)
/// previous path re-enters its branch without re-testing the filter, so a
/// user is never re-classified mid multi-turn exchange; only then is the
/// filter classified afresh.
fn resolve_state(
    filter: &WineFilter,
    previous: Option<&BranchPath>,
    settings: &DecisionSettings,
) -> Option<DecisionState> {
    if filter.has_name() {
        return Some(DecisionState::NameOverride);
    }

    let live_entry = previous
        .filter(|path| !path.is_empty() && !path.is_terminated())
        .and_then(BranchPath::first)
        .and_then(DecisionState::for_entry_token);
    if let Some(state) = live_entry {
        return Some(state);
    }

    classify(filter, settings)
}

fn classify(filter: &WineFilter, settings: &DecisionSettings) -> Option<DecisionState> {
    let filled = filter.primary_filled_count();
    let total = WineFilter::TOTAL_PRIMARY;
    let has_secondary = filter.has_secondary_filters();
    let has_expert = filter.has_expert_filters();

    if filled < total && has_secondary && has_expert {
        return Some(DecisionState::NeedsPrimaryWithSecondaryExpert);
    }
    if filled >= total && has_secondary && has_expert {
        return Some(DecisionState::CompletePrimaryWithSecondaryExpert);
    }
    if filled < total && !has_secondary && has_expert {
        return Some(DecisionState::PartialPrimaryNoSecondaryExpert);
    }
    if !has_expert && filled < total && filled + settings.near_complete_margin >= total {
        return Some(DecisionState::AlmostAllPrimaryNoExpert);
    }
    if !has_expert && filled < total {
        return Some(DecisionState::PartialPrimaryNoExpert);
    }
    if filled >= total {
        return Some(DecisionState::CompletePrimaryOther);
    }

    // Tier classification is exhaustive; reaching here is an invariant
    // violation handled as a fallback recommendation.
    None
}

fn transition<R: Rng + ?Sized>(
    state: DecisionState,
    previous_last: Option<BranchToken>,
    filter: &WineFilter,
    rng: &mut R,
) -> DecisionOutcome {
    let entry = state.entry_token();

    match state {
        DecisionState::NameOverride => recommend(entry, &[]),
        DecisionState::CompletePrimaryWithSecondaryExpert => recommend(entry, &[]),

        DecisionState::NeedsPrimaryWithSecondaryExpert
        | DecisionState::PartialPrimaryNoSecondaryExpert
        | DecisionState::PartialPrimaryNoExpert => match previous_last {
            Some(BranchToken::PromptPrimary) => prompt(
                entry,
                BranchToken::PromptSecondary,
                filter.random_secondary_filters(rng),
            ),
            Some(BranchToken::PromptSecondary) => recommend(entry, &[]),
            _ => prompt(entry, BranchToken::PromptPrimary, filter.empty_primary_filters()),
        },

        DecisionState::AlmostAllPrimaryNoExpert => match previous_last {
            Some(BranchToken::PromptSecondary) => recommend(entry, &[]),
            _ => prompt(
                entry,
                BranchToken::PromptSecondary,
                filter.random_secondary_filters(rng),
            ),
        },

        DecisionState::CompletePrimaryOther => match previous_last {
            Some(BranchToken::PromptRandomSecondary) => recommend(entry, &[]),
            _ => {
                if rng.gen_bool(0.5) {
                    prompt(
                        entry,
                        BranchToken::PromptRandomSecondary,
                        filter.random_secondary_filters(rng),
                    )
                } else {
                    recommend(entry, &[BranchToken::Rand])
                }
            }
        },
    }
}

fn prompt(
    entry: BranchToken,
    step: BranchToken,
    filters: Vec<crate::domain::filter::FilterAttribute>,
) -> DecisionOutcome {
    DecisionOutcome {
        action: NextAction::FilterPrompt { filters },
        path: BranchPath::from(vec![entry, step]),
    }
}

fn recommend(entry: BranchToken, via: &[BranchToken]) -> DecisionOutcome {
    let mut tokens = vec![entry];
    tokens.extend_from_slice(via);
    tokens.push(BranchToken::Recommend);
    DecisionOutcome { action: NextAction::Recommendation, path: BranchPath::from(tokens) }
}

#[cfg(test)]
mod tests {
    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::decision::path::{BranchPath, BranchToken};
    use crate::decision::states::{DecisionSettings, NextAction};
    use crate::decision::table::decide;
    use crate::domain::filter::{FilterAttribute, PriceRange, WineFilter};

    fn settings() -> DecisionSettings {
        DecisionSettings::default()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    /// StepRng yielding zero makes `gen_bool(0.5)` return true (prompt arm).
    fn coin_true() -> StepRng {
        StepRng::new(0, 0)
    }

    /// StepRng yielding max makes `gen_bool(0.5)` return false (random
    /// recommend arm).
    fn coin_false() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    fn rich_incomplete_filter() -> WineFilter {
        // zero primary, secondary present, expert present
        WineFilter {
            grape: Some("tempranillo".to_string()),
            vintage: Some(2016),
            ..WineFilter::default()
        }
    }

    fn all_primary_filter() -> WineFilter {
        WineFilter {
            price_range: Some(PriceRange { min: None, max: Some(4_000) }),
            color: Some("white".to_string()),
            country: Some("france".to_string()),
            style: Some("crisp".to_string()),
            ..WineFilter::default()
        }
    }

    fn path(tokens: &[BranchToken]) -> BranchPath {
        BranchPath::from(tokens.to_vec())
    }

    #[test]
    fn name_filter_always_recommends_regardless_of_history() {
        let filter = WineFilter { name: Some("Chateau Margaux".to_string()), ..WineFilter::default() };
        let histories = [
            None,
            Some(path(&[
                BranchToken::NotEnoughPrimaryAndNoExpert,
                BranchToken::PromptPrimary,
            ])),
            Some(path(&[BranchToken::AllPrimary, BranchToken::PromptRandomSecondary])),
        ];

        for previous in &histories {
            let outcome = decide(&filter, previous.as_ref(), &settings(), &mut rng());
            assert_eq!(outcome.action, NextAction::Recommendation);
            assert_eq!(outcome.path.to_string(), "notEmptyNameFilter->recommend");
        }
    }

    #[test]
    fn empty_filter_first_turn_prompts_all_primary_attributes() {
        let outcome = decide(&WineFilter::default(), None, &settings(), &mut rng());

        assert_eq!(
            outcome.action,
            NextAction::FilterPrompt { filters: FilterAttribute::PRIMARY.to_vec() }
        );
        assert_eq!(
            outcome.path.to_string(),
            "notEnoughPrimaryFiltersAndNoExpert->promptPrimary"
        );
    }

    #[test]
    fn rich_incomplete_filter_walks_prompt_primary_then_secondary_then_recommend() {
        let filter = rich_incomplete_filter();

        let first = decide(&filter, None, &settings(), &mut rng());
        assert_eq!(
            first.path.to_string(),
            "notEnoughPrimaryFiltersAndSomeSecondaryAndSomeExpert->promptPrimary"
        );
        assert_eq!(
            first.action,
            NextAction::FilterPrompt { filters: FilterAttribute::PRIMARY.to_vec() }
        );

        let second = decide(&filter, Some(&first.path), &settings(), &mut rng());
        assert_eq!(second.path.last(), Some(BranchToken::PromptSecondary));
        let NextAction::FilterPrompt { filters } = &second.action else {
            panic!("second turn should prompt secondary attributes");
        };
        assert!(!filters.is_empty());
        assert!(filters.iter().all(|attribute| FilterAttribute::SECONDARY.contains(attribute)));

        let third = decide(&filter, Some(&second.path), &settings(), &mut rng());
        assert_eq!(third.action, NextAction::Recommendation);
        assert_eq!(
            third.path.to_string(),
            "notEnoughPrimaryFiltersAndSomeSecondaryAndSomeExpert->recommend"
        );
    }

    #[test]
    fn all_primary_with_secondary_and_expert_recommends_immediately() {
        let filter = WineFilter {
            grape: Some("syrah".to_string()),
            region: Some("rhone".to_string()),
            ..all_primary_filter()
        };

        let outcome = decide(&filter, None, &settings(), &mut rng());
        assert_eq!(outcome.action, NextAction::Recommendation);
        assert_eq!(
            outcome.path.to_string(),
            "allPrimaryFiltersAndSomeSecondaryAndSomeExpert->recommend"
        );
    }

    #[test]
    fn expert_only_filter_enters_the_no_secondary_branch() {
        let filter = WineFilter { region: Some("mosel".to_string()), ..WineFilter::default() };

        let outcome = decide(&filter, None, &settings(), &mut rng());
        assert_eq!(
            outcome.path.to_string(),
            "notEnoughPrimaryFiltersAndNoSecondaryAndSomeExpert->promptPrimary"
        );
    }

    #[test]
    fn one_missing_primary_without_expert_is_almost_all() {
        let mut filter = all_primary_filter();
        filter.style = None;

        let first = decide(&filter, None, &settings(), &mut rng());
        assert_eq!(
            first.path.first(),
            Some(BranchToken::AlmostAllPrimaryAndNoExpert),
            "3/4 primary and no expert should take the almost-all branch"
        );
        assert_eq!(first.path.last(), Some(BranchToken::PromptSecondary));

        let second = decide(&filter, Some(&first.path), &settings(), &mut rng());
        assert_eq!(second.action, NextAction::Recommendation);
        assert_eq!(
            second.path.to_string(),
            "almostAllPrimaryFiltersAndNoExpert->recommend"
        );
    }

    #[test]
    fn near_complete_margin_widens_the_almost_all_branch() {
        let mut filter = all_primary_filter();
        filter.style = None;
        filter.country = None;

        let wide = DecisionSettings { near_complete_margin: 2, ..DecisionSettings::default() };
        let outcome = decide(&filter, None, &wide, &mut rng());
        assert_eq!(outcome.path.first(), Some(BranchToken::AlmostAllPrimaryAndNoExpert));

        let outcome = decide(&filter, None, &settings(), &mut rng());
        assert_eq!(outcome.path.first(), Some(BranchToken::NotEnoughPrimaryAndNoExpert));
    }

    #[test]
    fn complete_primary_coin_true_prompts_random_secondary() {
        let filter = all_primary_filter();

        let outcome = decide(&filter, None, &settings(), &mut coin_true());
        assert_eq!(
            outcome.path.to_string(),
            "allPrimaryFilters->promptRandomSecondary"
        );
        let NextAction::FilterPrompt { filters } = &outcome.action else {
            panic!("forced-true coin should prompt a secondary subset");
        };
        assert!(!filters.is_empty());
        assert!(filters.iter().all(|attribute| FilterAttribute::SECONDARY.contains(attribute)));
    }

    #[test]
    fn complete_primary_coin_false_recommends_through_rand_marker() {
        let filter = all_primary_filter();

        let outcome = decide(&filter, None, &settings(), &mut coin_false());
        assert_eq!(outcome.action, NextAction::Recommendation);
        assert_eq!(outcome.path.to_string(), "allPrimaryFilters->rand->recommend");
    }

    #[test]
    fn complete_primary_recommends_after_random_secondary_prompt() {
        let filter = all_primary_filter();
        let previous = path(&[BranchToken::AllPrimary, BranchToken::PromptRandomSecondary]);

        // No coin is flipped on re-entry; either mock arm must recommend.
        for mut forced in [coin_true(), coin_false()] {
            let outcome = decide(&filter, Some(&previous), &settings(), &mut forced);
            assert_eq!(outcome.action, NextAction::Recommendation);
            assert_eq!(outcome.path.to_string(), "allPrimaryFilters->recommend");
        }
    }

    #[test]
    fn never_reprompts_primary_after_prompting_primary() {
        let previous = path(&[
            BranchToken::NotEnoughPrimaryAndSomeSecondaryAndSomeExpert,
            BranchToken::PromptPrimary,
        ]);
        let outcome = decide(&rich_incomplete_filter(), Some(&previous), &settings(), &mut rng());

        assert_ne!(outcome.path.last(), Some(BranchToken::PromptPrimary));
        if let NextAction::FilterPrompt { filters } = &outcome.action {
            assert!(filters
                .iter()
                .all(|attribute| !FilterAttribute::PRIMARY.contains(attribute)));
        }
    }

    #[test]
    fn live_branch_is_reentered_even_if_the_filter_now_classifies_elsewhere() {
        // Previous turn prompted on the no-expert branch; the filter now has
        // an expert attribute, but a live path keeps the user on its branch.
        let filter = WineFilter { vintage: Some(2012), ..WineFilter::default() };
        let previous = path(&[
            BranchToken::NotEnoughPrimaryAndNoExpert,
            BranchToken::PromptPrimary,
        ]);

        let outcome = decide(&filter, Some(&previous), &settings(), &mut rng());
        assert_eq!(outcome.path.first(), Some(BranchToken::NotEnoughPrimaryAndNoExpert));
        assert_eq!(outcome.path.last(), Some(BranchToken::PromptSecondary));
    }

    #[test]
    fn terminated_previous_path_classifies_afresh() {
        let previous = path(&[
            BranchToken::NotEnoughPrimaryAndNoExpert,
            BranchToken::Recommend,
        ]);

        let outcome = decide(&rich_incomplete_filter(), Some(&previous), &settings(), &mut rng());
        assert_eq!(
            outcome.path.first(),
            Some(BranchToken::NotEnoughPrimaryAndSomeSecondaryAndSomeExpert)
        );
    }

    #[test]
    fn classification_is_idempotent_for_identical_inputs() {
        let filter = rich_incomplete_filter();
        let previous = path(&[
            BranchToken::NotEnoughPrimaryAndSomeSecondaryAndSomeExpert,
            BranchToken::PromptPrimary,
        ]);

        let first = decide(&filter, Some(&previous), &settings(), &mut StdRng::seed_from_u64(5));
        let second = decide(&filter, Some(&previous), &settings(), &mut StdRng::seed_from_u64(5));
        assert_eq!(first, second);
    }

    #[test]
    fn any_unchanged_filter_reaches_a_recommendation_within_three_turns() {
        let filters = [
            WineFilter::default(),
            rich_incomplete_filter(),
            all_primary_filter(),
            WineFilter { region: Some("rioja".to_string()), ..WineFilter::default() },
            WineFilter { name: Some("Vega Sicilia".to_string()), ..WineFilter::default() },
        ];

        // Exercise both coin arms for the all-primary filter as well.
        for seed in [3_u64, 99, 12345] {
            for filter in &filters {
                let mut turn_rng = StdRng::seed_from_u64(seed);
                let mut previous: Option<BranchPath> = None;
                let mut recommended = false;

                for _ in 1..=3 {
                    let outcome = decide(filter, previous.as_ref(), &settings(), &mut turn_rng);
                    if outcome.action == NextAction::Recommendation {
                        recommended = true;
                        break;
                    }
                    previous = Some(outcome.path);
                }

                assert!(recommended, "filter never converged within 3 turns: {filter:?}");
            }
        }
    }
}
