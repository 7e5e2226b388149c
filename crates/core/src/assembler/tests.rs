use super::*;
use crate::content::{TemplateLibrary, build_default_templates, keys};
use crate::types::{CollectibleKind, EggKind, Tier};

fn assembler_with(library: TemplateLibrary) -> ChunkAssembler {
    ChunkAssembler::new(Box::new(library), RunConfig::default(), RunSeed::from_text("1-2-3"))
}

fn loaded_assembler() -> ChunkAssembler {
    let mut library = TemplateLibrary::build_default();
    library.preload_all();
    assembler_with(library)
}

fn ids(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|id| id.to_string()).collect()
}

fn template_width(id: &str) -> i32 {
    build_default_templates()
        .into_iter()
        .find(|template| template.id == id)
        .map(|template| template.width)
        .expect("built-in template")
}

#[test]
fn unloaded_template_fails_without_moving_the_cursor() {
    let mut assembler = assembler_with(TemplateLibrary::build_default());
    let error = assembler
        .assemble_chunk(
            keys::EASY_1,
            true,
            true,
            InstanceIndex::Initial(0),
            RunMode::Practice,
            &CollectedIds::default(),
        )
        .expect_err("template was never loaded");

    assert_eq!(error, AssemblyError::TemplateNotLoaded { template_id: keys::EASY_1.to_string() });
    assert_eq!(assembler.world().cursor_x(), 0);
    assert!(assembler.world().tiles().is_empty());
    assert_eq!(assembler.world().gate_count(), 0);
}

#[test]
fn map_assigns_gate_ids_in_world_order() {
    let mut assembler = loaded_assembler();
    let sequence = ids(&[keys::EASY_2, keys::MEDIUM_1, keys::HARD_3]);
    let map = assembler.assemble_map(&sequence, &CollectedIds::default(), RunMode::Assessment);

    assert_eq!(map.gates, vec![GateId(0), GateId(1), GateId(2)]);
    assert!(map.skipped.is_empty());
    let offsets: Vec<i32> = assembler.world().gates().iter().map(|gate| gate.x_offset).collect();
    assert!(offsets.windows(2).all(|pair| pair[0] < pair[1]), "offsets {offsets:?}");

    let width: i32 = sequence.iter().map(|id| template_width(id)).sum();
    assert_eq!(assembler.world().bounds().width, width);
    assert_eq!(assembler.world().cursor_x(), width);
    assert_eq!(assembler.world().bounds().height, RunConfig::default().world_height);
}

#[test]
fn map_spawns_at_first_entry_and_finishes_at_last_exit() {
    let mut assembler = loaded_assembler();
    let sequence = ids(&[keys::EASY_1, keys::EASY_3]);
    let map = assembler.assemble_map(&sequence, &CollectedIds::default(), RunMode::Practice);

    let templates = build_default_templates();
    let first = templates.iter().find(|t| t.id == keys::EASY_1).expect("easy_1");
    let last = templates.iter().find(|t| t.id == keys::EASY_3).expect("easy_3");
    assert_eq!(Some(map.spawn_point), first.entry);

    let finish = assembler.world().finish_zone().expect("finish marker");
    let finish_rect = assembler.world().zone(finish).expect("finish zone").rect;
    let expected_x = first.width + last.exit.expect("exit marker").x;
    assert_eq!(finish_rect.x, expected_x);
}

#[test]
fn failed_chunks_are_skipped_and_the_rest_still_assembles() {
    let mut library = TemplateLibrary::build_default();
    library.preload([keys::EASY_1, keys::HARD_1]);
    let mut assembler = assembler_with(library);
    let sequence = ids(&[keys::EASY_1, keys::MEDIUM_2, keys::HARD_1]);
    let map = assembler.assemble_map(&sequence, &CollectedIds::default(), RunMode::Assessment);

    assert_eq!(map.skipped, ids(&[keys::MEDIUM_2]));
    assert_eq!(map.gates.len(), 2);
    assert_eq!(
        assembler.world().cursor_x(),
        template_width(keys::EASY_1) + template_width(keys::HARD_1)
    );
}

#[test]
fn appended_chunks_continue_gate_ids() {
    let mut assembler = loaded_assembler();
    let sequence = ids(&[keys::EASY_1, keys::MEDIUM_1, keys::HARD_1]);
    assembler.assemble_map(&sequence, &CollectedIds::default(), RunMode::Assessment);

    for template_id in [keys::EASY_4, keys::HARD_2] {
        assembler.append_chunk(template_id).expect("append should succeed");
    }

    let gate_ids: Vec<u32> = assembler.world().gates().iter().map(|gate| gate.id.0).collect();
    assert_eq!(gate_ids, vec![0, 1, 2, 3, 4]);
}

#[test]
fn append_loads_missing_templates_and_moves_the_finish() {
    let mut library = TemplateLibrary::build_default();
    library.preload([keys::EASY_1]);
    let mut assembler = assembler_with(library);
    assembler.assemble_map(&ids(&[keys::EASY_1]), &CollectedIds::default(), RunMode::Assessment);
    let old_finish = assembler.world().finish_zone().expect("finish");
    let old_width = assembler.world().bounds().width;

    let chunk = assembler.append_chunk(keys::HARD_4).expect("append loads the template");

    assert!(assembler.source().is_loaded(keys::HARD_4));
    assert_eq!(chunk.gate, Some(GateId(1)));
    assert!(assembler.world().zone(old_finish).is_none());
    let new_finish = assembler.world().finish_zone().expect("new finish");
    let rect = assembler.world().zone(new_finish).expect("zone").rect;
    assert!(rect.x > old_width);
    assert_eq!(assembler.world().bounds().width, old_width + template_width(keys::HARD_4));
    assert_eq!(assembler.world().chunks()[chunk.chunk_index].instance, InstanceIndex::Extension);
}

#[test]
fn failed_append_keeps_the_previous_finish() {
    let mut assembler = loaded_assembler();
    assembler.assemble_map(&ids(&[keys::EASY_1]), &CollectedIds::default(), RunMode::Assessment);
    let finish = assembler.world().finish_zone();
    let cursor = assembler.world().cursor_x();

    let error = assembler.append_chunk("volcano_1").expect_err("unknown template");

    assert!(matches!(error, AssemblyError::Asset(AssetError::UnknownTemplate { .. })));
    assert_eq!(assembler.world().finish_zone(), finish);
    assert_eq!(assembler.world().cursor_x(), cursor);
}

#[test]
fn practice_spawns_one_pickup_per_marker() {
    let mut assembler = loaded_assembler();
    let sequence = ids(&[keys::EASY_1, keys::MEDIUM_1]);
    let map = assembler.assemble_map(&sequence, &CollectedIds::default(), RunMode::Practice);

    let templates = build_default_templates();
    let markers = |id: &str, kind: CollectibleKind| {
        let template = templates.iter().find(|t| t.id == id).expect("template");
        match kind {
            CollectibleKind::Coin => template.coin_spawns.len(),
            CollectibleKind::Egg => template.egg_spawns.len(),
        }
    };
    let expected = |kind| markers(keys::EASY_1, kind) + markers(keys::MEDIUM_1, kind);
    assert_eq!(map.coins.len(), expected(CollectibleKind::Coin));
    assert_eq!(map.eggs.len(), expected(CollectibleKind::Egg));

    let medium_coin = assembler
        .world()
        .pickups()
        .find(|(_, pickup)| pickup.identity == "medium_1_1_1")
        .map(|(_, pickup)| pickup.value);
    assert_eq!(medium_coin, Some(RunConfig::default().coin_values.for_tier(Tier::Medium)));
}

#[test]
fn collected_identities_are_never_recreated() {
    let mut assembler = loaded_assembler();
    let sequence = ids(&[keys::EASY_1, keys::EASY_1]);
    let mut collected = CollectedIds::default();
    collected.insert(CollectibleKind::Coin, "easy_1_0_2".to_string());
    collected.insert(CollectibleKind::Egg, "easy_1_1_100".to_string());

    assembler.assemble_map(&sequence, &collected, RunMode::Practice);

    let identities: Vec<&str> =
        assembler.world().pickups().map(|(_, pickup)| pickup.identity.as_str()).collect();
    assert!(!identities.contains(&"easy_1_0_2"));
    assert!(!identities.contains(&"easy_1_1_100"));
    // The repeated template gets its own identities through the instance index.
    assert!(identities.contains(&"easy_1_1_2"));
    assert!(identities.contains(&"easy_1_0_100"));
}

#[test]
fn assessment_and_extension_chunks_spawn_no_collectibles() {
    let mut assembler = loaded_assembler();
    let map = assembler.assemble_map(
        &ids(&[keys::EASY_1, keys::EASY_2]),
        &CollectedIds::default(),
        RunMode::Assessment,
    );
    assert!(map.coins.is_empty() && map.eggs.is_empty());

    let mut practice = loaded_assembler();
    practice.assemble_map(&ids(&[keys::EASY_1]), &CollectedIds::default(), RunMode::Practice);
    let before = practice.world().pickups().count();
    let chunk = practice.append_chunk(keys::EASY_2).expect("append");
    assert!(chunk.coins.is_empty() && chunk.eggs.is_empty());
    assert_eq!(practice.world().pickups().count(), before);
}

#[test]
fn egg_rolls_are_identical_across_rebuilds() {
    let sequence = ids(&[keys::EASY_1, keys::EASY_2, keys::MEDIUM_1, keys::HARD_1]);
    let eggs = |assembler: &mut ChunkAssembler| {
        assembler.assemble_map(&sequence, &CollectedIds::default(), RunMode::Practice);
        let mut eggs: Vec<(String, Option<EggKind>)> = assembler
            .world()
            .pickups()
            .filter(|(_, pickup)| pickup.kind == CollectibleKind::Egg)
            .map(|(_, pickup)| (pickup.identity.clone(), pickup.egg_kind))
            .collect();
        eggs.sort_by(|a, b| a.0.cmp(&b.0));
        eggs
    };

    let mut assembler = loaded_assembler();
    let first = eggs(&mut assembler);
    let second = eggs(&mut assembler);
    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
}

#[test]
fn auxiliary_layers_are_not_instantiated_and_hazards_are_registered() {
    let mut assembler = loaded_assembler();
    let chunk = assembler
        .assemble_chunk(
            keys::HARD_1,
            true,
            true,
            InstanceIndex::Initial(0),
            RunMode::Assessment,
            &CollectedIds::default(),
        )
        .expect("loaded template");

    let template = build_default_templates()
        .into_iter()
        .find(|t| t.id == keys::HARD_1)
        .expect("hard_1");
    let placed: usize = template
        .layers
        .iter()
        .filter(|layer| !layer.auxiliary)
        .map(|layer| layer.tiles.len())
        .sum();
    assert_eq!(assembler.world().tiles().len(), placed);
    assert!(!chunk.hazard_tiles.is_empty());
    for index in &chunk.hazard_tiles {
        assert!(assembler.world().tile(*index).is_some_and(|tile| tile.hazard));
    }
}

#[test]
fn missing_markers_fall_back_to_defaults() {
    let mut bare = build_default_templates().remove(0);
    bare.id = "bare".to_string();
    bare.entry = None;
    bare.exit = None;
    let width = bare.width;
    let mut library = TemplateLibrary::new([bare]);
    library.preload_all();
    let mut assembler = assembler_with(library);

    let map = assembler.assemble_map(&ids(&["bare"]), &CollectedIds::default(), RunMode::Practice);

    let height = RunConfig::default().world_height;
    assert_eq!(map.spawn_point, Pos { x: 32, y: height - 96 });
    let finish = assembler.world().finish_zone().expect("finish");
    assert_eq!(assembler.world().zone(finish).map(|zone| zone.rect.x), Some(width - 32));
}

#[test]
fn new_gates_start_with_every_zone_inactive() {
    let mut assembler = loaded_assembler();
    let sequence = ids(&[keys::EASY_1, keys::EASY_2]);
    assembler.assemble_map(&sequence, &CollectedIds::default(), RunMode::Practice);
    assert!(assembler.world().active_triggers().is_empty());
    for gate in assembler.world().gates() {
        for zone in [gate.trigger, gate.pass, gate.fail] {
            assert!(!assembler.world().zone(zone).expect("gate zone").active);
        }
    }
}
