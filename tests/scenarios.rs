//! End-to-end scenarios with literal inputs and expected outputs.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::TimeZone;

use starmap::authority::{AuthorityEntry, AuthorityTable};
use starmap::catalog::{open_catalog, Catalog, ModelEntry};
use starmap::core::clock::ManualClock;
use starmap::diff::{diff_catalogs, ChangeKind, DiffOptions};
use starmap::export::{to_openai_list, to_openrouter_list};
use starmap::merge::{MergeEngine, SourceBatch};
use starmap::types::{
    Model, ModelLimits, ModelPricing, Provider, ResourceKind, TokenCost, TokenPricing,
};

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::starting_at(
        chrono::Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
    ))
}

fn catalog_from(providers: Vec<Provider>) -> Catalog {
    let map: BTreeMap<String, Provider> =
        providers.into_iter().map(|p| (p.id.clone(), p)).collect();
    Catalog::new(map, BTreeMap::new(), Default::default())
}

/// S1: one source, one provider, one model; merged catalog, provenance, and
/// changeset all reflect exactly that.
#[test]
fn s1_single_source_identity() {
    let mut model = Model::new("gpt-x");
    model.name = "GPT X".into();
    model.limits = Some(ModelLimits {
        context_window: Some(128_000),
        output_tokens: Some(4_096),
    });
    let mut provider = Provider::new("openai", "OpenAI");
    provider.models.insert(model.id.clone(), model);

    let engine = MergeEngine::new(AuthorityTable::with_defaults(), clock());
    let outcome = engine.merge(
        &Catalog::empty(),
        &[SourceBatch {
            source: "openai".into(),
            priority: 0,
            order: 0,
            providers: vec![provider],
            authors: Vec::new(),
        }],
    );

    let models = outcome.catalog.models();
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].model.name, "GPT X");
    assert_eq!(
        models[0].model.limits.as_ref().unwrap().context_window,
        Some(128_000)
    );

    let provenance = outcome.catalog.provenance();
    let fields = provenance.find_by_resource(ResourceKind::Model, "openai/gpt-x");
    for field in ["name", "limits.context_window", "limits.output_tokens"] {
        let history = fields.get(field).expect(field);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].source, "openai");
    }

    let changeset = diff_catalogs(&Catalog::empty(), &outcome.catalog, &DiffOptions::default());
    assert_eq!(changeset.summary.providers.added, 1);
    assert_eq!(changeset.summary.models.added, 1);
    assert_eq!(changeset.summary.providers.removed, 0);
    assert_eq!(changeset.summary.models.removed, 0);
}

/// S2: the higher-authority source wins the field; both attempts land in
/// provenance with the winner newest.
#[test]
fn s2_authority_override() {
    let priced = |rate: f64| {
        let mut model = Model::new("m");
        model.pricing = Some(ModelPricing {
            tokens: Some(TokenPricing {
                input: Some(TokenCost::new(rate)),
                ..Default::default()
            }),
            ..Default::default()
        });
        let mut provider = Provider::new("p", "P");
        provider.models.insert("m".into(), model);
        provider
    };

    let mut table = AuthorityTable::new();
    table.extend([
        AuthorityEntry::new("pricing.tokens.input.per_1m", "a", 0.9),
        AuthorityEntry::new("pricing.tokens.input.per_1m", "b", 0.5),
    ]);

    let outcome = MergeEngine::new(table, clock()).merge(
        &Catalog::empty(),
        &[
            SourceBatch {
                source: "a".into(),
                priority: 0,
                order: 0,
                providers: vec![priced(0.003)],
                authors: Vec::new(),
            },
            SourceBatch {
                source: "b".into(),
                priority: 0,
                order: 1,
                providers: vec![priced(0.004)],
                authors: Vec::new(),
            },
        ],
    );

    let merged = outcome.catalog.provider("p").unwrap().models["m"].clone();
    assert_eq!(
        merged.pricing.unwrap().tokens.unwrap().input.unwrap().per_1m,
        0.003
    );

    let provenance = outcome.catalog.provenance();
    let history = &provenance.find_by_resource(ResourceKind::Model, "p/m")
        ["pricing.tokens.input.per_1m"];
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].source, "a");
    assert_eq!(history[1].source, "b");
    assert!(history[0].timestamp > history[1].timestamp);
}

/// S5: a rename shows up as one updated model with a single field change.
#[test]
fn s5_diff_with_rename() {
    let named = |name: &str| {
        let mut model = Model::new("m1");
        model.name = name.into();
        let mut provider = Provider::new("p", "P");
        provider.models.insert(model.id.clone(), model);
        provider
    };
    let existing = catalog_from(vec![named("Old")]);
    let updated = catalog_from(vec![named("New")]);

    let changeset = diff_catalogs(&existing, &updated, &DiffOptions::default());
    assert_eq!(changeset.summary.models.added, 0);
    assert_eq!(changeset.summary.models.removed, 0);
    assert_eq!(changeset.summary.models.updated, 1);

    let fields = &changeset.models.updated[0].fields;
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].path, "name");
    assert_eq!(fields[0].old, "Old");
    assert_eq!(fields[0].new, "New");
    assert_eq!(fields[0].kind, ChangeKind::Update);
}

/// S6: export renderings pin the numeric formats.
#[test]
fn s6_export_render() {
    // 0.000007 per token = 7 per 1M tokens.
    let mut model = Model::new("gpt-x");
    model.pricing = Some(ModelPricing {
        tokens: Some(TokenPricing {
            input: Some(TokenCost::new(7.0)),
            ..Default::default()
        }),
        ..Default::default()
    });
    let entry = ModelEntry {
        provider: "openai".into(),
        model,
    };
    let openrouter = to_openrouter_list(std::slice::from_ref(&entry));
    assert_eq!(openrouter.data[0].pricing.prompt, "0.0000070000");

    let mut model = Model::new("phi-4");
    model.authors = vec!["meta".into(), "microsoft".into()];
    let openai = to_openai_list(&[ModelEntry {
        provider: "azure".into(),
        model,
    }]);
    assert_eq!(openai.data[0].owned_by, "meta,microsoft");

    let json = serde_json::to_value(&openrouter).unwrap();
    assert_eq!(json["data"][0]["pricing"]["prompt"], "0.0000070000");
    assert_eq!(json["data"][0]["pricing"]["completion"], "0");
}

/// The embedded baseline opens, validates, and reads back deep copies.
#[test]
fn embedded_baseline_opens() {
    let handle = open_catalog().expect("embedded catalog must load");
    let providers = handle.providers();
    assert!(providers.len() >= 5);
    assert_eq!(providers.resolve("gemini").unwrap().id, "google");

    let models = handle.models();
    assert!(models.len() >= 8);
    // Flattened ordering is by model id ascending.
    let ids: Vec<&str> = models.iter().map(|e| e.model.id.as_str()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);

    // Mutating a read never leaks back into the store.
    let mut copy = handle.provider("openai").unwrap();
    copy.models.clear();
    assert!(!handle.provider("openai").unwrap().models.is_empty());
}
