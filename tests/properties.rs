//! Property-based invariants over the catalog, merge, and diff subsystems.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::TimeZone;
use proptest::prelude::*;

use starmap::authority::{AuthorityEntry, AuthorityTable};
use starmap::catalog::Catalog;
use starmap::core::clock::ManualClock;
use starmap::core::fieldpath::field_matches;
use starmap::diff::{diff_catalogs, ApplyStrategy, DiffOptions};
use starmap::merge::{MergeEngine, SourceBatch};
use starmap::types::{Model, ModelLimits, ModelPricing, Provider, TokenCost, TokenPricing};

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::starting_at(
        chrono::Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    ))
}

prop_compose! {
    fn arb_model()(
        id in "[a-z][a-z0-9-]{1,12}",
        name in proptest::option::of("[A-Za-z0-9 ]{1,16}"),
        context in proptest::option::of(1_000i64..2_000_000),
        output in proptest::option::of(1_000i64..200_000),
        input_price in proptest::option::of(0.01f64..50.0),
    ) -> Model {
        let mut model = Model::new(id);
        if let Some(name) = name {
            model.name = name;
        }
        if context.is_some() || output.is_some() {
            model.limits = Some(ModelLimits { context_window: context, output_tokens: output });
        }
        if let Some(rate) = input_price {
            model.pricing = Some(ModelPricing {
                tokens: Some(TokenPricing { input: Some(TokenCost::new(rate)), ..Default::default() }),
                ..Default::default()
            });
        }
        model
    }
}

prop_compose! {
    fn arb_provider()(
        id in "[a-z][a-z0-9-]{1,8}",
        models in proptest::collection::vec(arb_model(), 0..4),
    ) -> Provider {
        let mut provider = Provider::new(id.clone(), id.to_uppercase());
        for model in models {
            provider.models.insert(model.id.clone(), model);
        }
        provider
    }
}

fn catalog_from(providers: Vec<Provider>) -> Catalog {
    let map: BTreeMap<String, Provider> =
        providers.into_iter().map(|p| (p.id.clone(), p)).collect();
    Catalog::new(map, BTreeMap::new(), Default::default())
}

fn batch(source: &str, order: usize, providers: Vec<Provider>) -> SourceBatch {
    SourceBatch {
        source: source.to_string(),
        priority: 0,
        order,
        providers,
        authors: Vec::new(),
    }
}

proptest! {
    /// Deep-copy isolation: mutating an accessor's result never changes a
    /// subsequent read.
    #[test]
    fn deep_copy_isolation(providers in proptest::collection::vec(arb_provider(), 1..4)) {
        let catalog = catalog_from(providers);
        let before = catalog.providers().list();

        let mut stolen = catalog.providers().list();
        for p in &mut stolen {
            p.name = "MUTATED".into();
            p.models.clear();
        }
        let mut models = catalog.models();
        for entry in &mut models {
            entry.model.name = "MUTATED".into();
        }

        prop_assert_eq!(catalog.providers().list(), before);
    }

    /// Merge determinism: any permutation of the same batches produces an
    /// identical catalog and provenance set.
    #[test]
    fn merge_determinism(
        providers_a in proptest::collection::vec(arb_provider(), 0..3),
        providers_b in proptest::collection::vec(arb_provider(), 0..3),
        providers_c in proptest::collection::vec(arb_provider(), 0..3),
    ) {
        let make = || vec![
            batch("alpha", 0, providers_a.clone()),
            batch("beta", 1, providers_b.clone()),
            batch("gamma", 2, providers_c.clone()),
        ];
        let table = AuthorityTable::with_defaults();

        let forward = make();
        let mut reverse = make();
        reverse.reverse();
        let mut rotated = make();
        rotated.rotate_left(1);

        let out_fwd = MergeEngine::new(table.clone(), clock()).merge(&Catalog::empty(), &forward);
        let out_rev = MergeEngine::new(table.clone(), clock()).merge(&Catalog::empty(), &reverse);
        let out_rot = MergeEngine::new(table, clock()).merge(&Catalog::empty(), &rotated);

        prop_assert_eq!(out_fwd.catalog.providers().list(), out_rev.catalog.providers().list());
        prop_assert_eq!(out_fwd.catalog.provenance(), out_rev.catalog.provenance());
        prop_assert_eq!(out_fwd.catalog.providers().list(), out_rot.catalog.providers().list());
        prop_assert_eq!(out_fwd.catalog.provenance(), out_rot.catalog.provenance());
    }

    /// Authority respects the table: with distinct scores, the winning value
    /// comes from the highest-scored source.
    #[test]
    fn authority_respects_table(
        score_a in 0.01f64..1.0,
        score_b in 0.01f64..1.0,
        rate_a in 0.01f64..100.0,
        rate_b in 0.01f64..100.0,
    ) {
        prop_assume!((score_a - score_b).abs() > 1e-6);
        prop_assume!((rate_a - rate_b).abs() > 1e-6);

        let priced = |rate: f64| {
            let mut model = Model::new("m");
            model.pricing = Some(ModelPricing {
                tokens: Some(TokenPricing { input: Some(TokenCost::new(rate)), ..Default::default() }),
                ..Default::default()
            });
            let mut provider = Provider::new("p", "P");
            provider.models.insert("m".into(), model);
            provider
        };

        let mut table = AuthorityTable::new();
        table.extend([
            AuthorityEntry::new("pricing.tokens.input.per_1m", "a", score_a),
            AuthorityEntry::new("pricing.tokens.input.per_1m", "b", score_b),
        ]);
        let outcome = MergeEngine::new(table, clock()).merge(
            &Catalog::empty(),
            &[batch("a", 0, vec![priced(rate_a)]), batch("b", 1, vec![priced(rate_b)])],
        );

        let expected = if score_a > score_b { rate_a } else { rate_b };
        let merged = outcome.catalog.provider("p").unwrap().models["m"].clone();
        let got = merged.pricing.unwrap().tokens.unwrap().input.unwrap().per_1m;
        prop_assert_eq!(got, expected);
    }

    /// Changeset round-trip: a catalog diffed against itself is empty.
    #[test]
    fn diff_round_trip_is_empty(providers in proptest::collection::vec(arb_provider(), 0..4)) {
        let catalog = catalog_from(providers);
        let changeset = diff_catalogs(&catalog, &catalog, &DiffOptions::default());
        prop_assert!(changeset.is_empty());
        prop_assert_eq!(changeset.summary.total_changes, 0);
    }

    /// Filtering is idempotent for every strategy.
    #[test]
    fn filter_idempotence(
        old_providers in proptest::collection::vec(arb_provider(), 0..3),
        new_providers in proptest::collection::vec(arb_provider(), 0..3),
    ) {
        let existing = catalog_from(old_providers);
        let updated = catalog_from(new_providers);
        let changeset = diff_catalogs(&existing, &updated, &DiffOptions::default());

        for strategy in [
            ApplyStrategy::All,
            ApplyStrategy::Additive,
            ApplyStrategy::UpdatesOnly,
            ApplyStrategy::AdditionsOnly,
        ] {
            let once = changeset.filter(strategy);
            let twice = once.filter(strategy);
            prop_assert_eq!(once, twice);
        }
    }

    /// Additive filtering leaves zero entries in any removed set.
    #[test]
    fn additive_safety(
        old_providers in proptest::collection::vec(arb_provider(), 0..3),
        new_providers in proptest::collection::vec(arb_provider(), 0..3),
    ) {
        let existing = catalog_from(old_providers);
        let updated = catalog_from(new_providers);
        let additive = diff_catalogs(&existing, &updated, &DiffOptions::default())
            .filter(ApplyStrategy::Additive);

        prop_assert!(additive.providers.removed.is_empty());
        prop_assert!(additive.models.removed.is_empty());
        prop_assert!(additive.authors.removed.is_empty());
        prop_assert_eq!(additive.summary.providers.removed, 0);
        prop_assert_eq!(additive.summary.models.removed, 0);
        prop_assert_eq!(additive.summary.authors.removed, 0);
    }

    /// Provenance coverage: every populated model field in a merged catalog
    /// has at least one matching record.
    #[test]
    fn provenance_coverage(providers in proptest::collection::vec(arb_provider(), 1..3)) {
        let outcome = MergeEngine::new(AuthorityTable::with_defaults(), clock())
            .merge(&Catalog::empty(), &[batch("solo", 0, providers)]);

        let provenance = outcome.catalog.provenance();
        for entry in outcome.catalog.models() {
            let fields = provenance.find_by_resource(
                starmap::types::ResourceKind::Model,
                &entry.qualified_id(),
            );
            for spec in starmap::schema::model_fields() {
                if let Some(value) = (spec.get)(&entry.model) {
                    if value.is_empty() {
                        continue;
                    }
                    prop_assert!(
                        fields.contains_key(spec.path),
                        "no provenance for {} on {}",
                        spec.path,
                        entry.qualified_id()
                    );
                }
            }
        }
    }

    /// Field glob matching is case-insensitive, including the `.*` form.
    #[test]
    fn glob_matching_case_insensitive(upper in proptest::bool::ANY) {
        let pattern = if upper { "PRICING.*" } else { "pricing.*" };
        prop_assert!(field_matches(pattern, "pricing.tokens.input.per_1m"));
        prop_assert!(field_matches(pattern, "PRICING.tokens.input"));
        prop_assert!(field_matches("pricing.*", "Pricing"));
        prop_assert!(!field_matches(pattern, "limits.context_window"));
    }
}
