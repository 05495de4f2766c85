pub mod fixtures;

use beebo_assembly::*;
use beebo_core::{AccessorySlot, Slot};
use fixtures::*;

const COAT: usize = 1;
const CLOAK: usize = 2;
const BEARD: usize = 1;
const BEANIE: usize = 1;
const AFRO: usize = 2;

async fn assembled() -> Assembler<MemoryStore> {
    let assembler = Assembler::new(catalog(), store(), &settings());
    assembler.place_defaults().await;
    assembler
}

/// Beanie on the head, then a Cloak that reaches into it
async fn cloak_under_beanie() -> Assembler<MemoryStore> {
    let assembler = assembled().await;
    assert_eq!(assembler.select(Slot::HEAD, BEANIE).await.unwrap(), SelectOutcome::Placed);
    let outcome = assembler.select(Slot::CLOTHES, CLOAK).await.unwrap();
    match outcome {
        SelectOutcome::Withheld { colliding_with } => {
            assert_eq!(colliding_with.display_name, "Beanie")
        }
        other => panic!("expected the cloak to be withheld, got {:?}", other),
    }
    assembler
}

#[tokio::test]
async fn test_disjoint_accessories_both_placed() {
    let assembler = assembled().await;
    assert_eq!(assembler.select(Slot::CLOTHES, COAT).await.unwrap(), SelectOutcome::Placed);
    assert_eq!(
        assembler.select(Slot::FACE_ACCESSORY, BEARD).await.unwrap(),
        SelectOutcome::Placed
    );

    let snapshot = assembler.snapshot().await;
    assert_eq!(snapshot.state(Slot::CLOTHES), SlotState::Placed);
    assert_eq!(snapshot.state(Slot::FACE_ACCESSORY), SlotState::Placed);
    assert_eq!(snapshot.collisions, CollisionState::default());

    // Coat and Beard boxes never touch, so the pair is culled before any ray
    let stats = assembler.detector().stats();
    assert!(stats.broad_phase_rejections() >= 1);
    assert_eq!(stats.rays_cast(), 0);
}

#[tokio::test]
async fn test_cross_slot_overlap_is_withheld() {
    let assembler = assembled().await;
    assembler.select(Slot::HEAD, BEANIE).await.unwrap();

    let mut events = assembler.subscribe();
    assembler.select(Slot::CLOTHES, CLOAK).await.unwrap();

    let snapshot = assembler.snapshot().await;
    assert!(snapshot.collisions.clothes);
    assert!(!snapshot.collisions.head);
    assert!(!snapshot.placed.contains_key(&Slot::CLOTHES));
    assert_eq!(
        snapshot.state(Slot::CLOTHES),
        SlotState::Withheld {
            colliding_with: "Beanie".to_string()
        }
    );
    assert_eq!(snapshot.index(Slot::CLOTHES), CLOAK);

    let mut warning = None;
    while let Ok(event) = events.try_recv() {
        if let AssemblyEvent::CollisionWarning { message, .. } = event {
            warning = Some(message);
        }
    }
    assert_eq!(
        warning.as_deref(),
        Some("Item \"Cloak\" collides with \"Beanie\". Please choose something else.")
    );

    // Withheld items stay selected but are not charged
    let quote = assembler.quote().await;
    let cloak = quote.lines.iter().find(|l| l.slot == Slot::CLOTHES).unwrap();
    assert!(!cloak.active);
    let charged: f64 = quote.lines.iter().filter(|l| l.active).map(|l| l.price).sum();
    assert!((quote.total - charged).abs() < 1e-9);
}

#[tokio::test]
async fn test_clearing_blocker_places_withheld_item() {
    let assembler = cloak_under_beanie().await;

    assert_eq!(assembler.select(Slot::HEAD, 0).await.unwrap(), SelectOutcome::Cleared);
    assembler.reconcile_all().await;

    let snapshot = assembler.snapshot().await;
    assert!(!snapshot.collisions.clothes);
    assert_eq!(snapshot.state(Slot::CLOTHES), SlotState::Placed);
    assert_eq!(
        snapshot.placed.get(&Slot::CLOTHES).map(String::as_str),
        Some("accessories_clothes_cloak")
    );
    assert!(!snapshot.placed.contains_key(&Slot::HEAD));
}

#[tokio::test]
async fn test_same_slot_replacement_never_self_collides() {
    let assembler = assembled().await;
    assembler.select(Slot::HEAD, BEANIE).await.unwrap();
    assert_eq!(assembler.select(Slot::HEAD, AFRO).await.unwrap(), SelectOutcome::Placed);
    assert_eq!(assembler.select(Slot::HEAD, BEANIE).await.unwrap(), SelectOutcome::Placed);
    assert!(!assembler.snapshot().await.collisions.head);
}

#[tokio::test]
async fn test_replacing_blocker_with_withheld_item_unblocks_others() {
    let assembler = cloak_under_beanie().await;

    // Afro sits clear of the cloak; swapping it in frees the clothes slot
    assert_eq!(assembler.select(Slot::HEAD, AFRO).await.unwrap(), SelectOutcome::Placed);
    let snapshot = assembler.snapshot().await;
    assert_eq!(snapshot.state(Slot::CLOTHES), SlotState::Placed);
    assert!(!snapshot.collisions.any());
}

#[tokio::test]
async fn test_reconcile_is_idempotent() {
    let assembler = cloak_under_beanie().await;
    assembler.select(Slot::FACE_ACCESSORY, BEARD).await.unwrap();

    assembler.reconcile_all().await;
    let first = assembler.snapshot().await;
    assembler.reconcile_all().await;
    let second = assembler.snapshot().await;

    assert_eq!(first, second);
    assert!(second.collisions.clothes);
    assert_eq!(second.state(Slot::FACE_ACCESSORY), SlotState::Placed);
}

#[tokio::test]
async fn test_reset_restores_defaults() {
    let assembler = cloak_under_beanie().await;
    assembler.select(Slot::FACE_ACCESSORY, BEARD).await.unwrap();

    let mut events = assembler.subscribe();
    assembler.reset_all().await;

    let snapshot = assembler.snapshot().await;
    assert!(snapshot.is_default());
    assert_eq!(snapshot.collisions, CollisionState::default());
    assert_eq!(snapshot.placed.len(), 4);
    for slot in Slot::ALL {
        assert_eq!(snapshot.index(slot), 0);
        assert_eq!(snapshot.placed.contains_key(&slot), !slot.is_accessory());
    }

    let mut saw_reset = false;
    while let Ok(event) = events.try_recv() {
        saw_reset |= event == AssemblyEvent::Reset;
    }
    assert!(saw_reset);
}

#[tokio::test]
async fn test_disabling_checks_loads_withheld() {
    let assembler = cloak_under_beanie().await;
    assembler.set_collision_checks(false).await;

    let snapshot = assembler.snapshot().await;
    assert!(!snapshot.collisions.clothes);
    assert_eq!(snapshot.state(Slot::CLOTHES), SlotState::Placed);
    assert_eq!(snapshot.state(Slot::HEAD), SlotState::Placed);
}

#[tokio::test]
async fn test_stale_load_has_no_effect() {
    let store = GatedStore::new(store(), "beanie.glb");
    let gate = store.gate.clone();
    let assembler = Assembler::new(catalog(), store, &settings());

    let first = assembler.select(Slot::HEAD, BEANIE);
    let second = async {
        let outcome = assembler.select(Slot::HEAD, AFRO).await;
        gate.notify_one();
        outcome
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.unwrap(), SelectOutcome::Superseded);
    assert_eq!(second.unwrap(), SelectOutcome::Placed);

    let snapshot = assembler.snapshot().await;
    assert_eq!(
        snapshot.placed.get(&Slot::HEAD).map(String::as_str),
        Some("accessories_head_afro")
    );
    assert_eq!(snapshot.state(Slot::HEAD), SlotState::Placed);
    assert_eq!(snapshot.index(Slot::HEAD), AFRO);
    assert_eq!(snapshot.pending_loads, 0);
}

#[tokio::test]
async fn test_stale_collision_result_has_no_effect() {
    let store = GatedStore::new(store(), "cloak.glb");
    let gate = store.gate.clone();
    let assembler = Assembler::new(catalog(), store, &settings());
    assembler.select(Slot::HEAD, BEANIE).await.unwrap();

    // The cloak check would collide, but the coat supersedes it first
    let first = assembler.select(Slot::CLOTHES, CLOAK);
    let second = async {
        let outcome = assembler.select(Slot::CLOTHES, COAT).await;
        gate.notify_one();
        outcome
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.unwrap(), SelectOutcome::Superseded);
    assert_eq!(second.unwrap(), SelectOutcome::Placed);

    let snapshot = assembler.snapshot().await;
    assert!(!snapshot.collisions.get(AccessorySlot::Clothes));
    assert_eq!(
        snapshot.placed.get(&Slot::CLOTHES).map(String::as_str),
        Some("accessories_clothes_coat")
    );
    assert_eq!(snapshot.state(Slot::CLOTHES), SlotState::Placed);
}

#[tokio::test]
async fn test_none_selection_never_fetches() {
    let assembler = assembled().await;
    assembler.select(Slot::HEAD, BEANIE).await.unwrap();
    let fetches = assembler.loader().store().fetch_count();

    assert_eq!(assembler.select(Slot::CLOTHES, 0).await.unwrap(), SelectOutcome::Cleared);
    assert_eq!(assembler.loader().store().fetch_count(), fetches);
}

#[tokio::test]
async fn test_selection_supersedes_reconciled_load() {
    let store = GatedStore::new(store(), "cloak.glb").disarmed();
    let gate = store.gate.clone();
    let assembler = Assembler::new(catalog(), store, &settings());
    assembler.select(Slot::HEAD, BEANIE).await.unwrap();
    assert!(matches!(
        assembler.select(Slot::CLOTHES, CLOAK).await.unwrap(),
        SelectOutcome::Withheld { .. }
    ));
    assembler.loader().store().arm();

    // Clearing the head lets reconciliation load the cloak, which stalls;
    // the coat is chosen while it is in flight
    let first = assembler.select(Slot::HEAD, 0);
    let second = async {
        let outcome = assembler.select(Slot::CLOTHES, COAT).await;
        gate.notify_one();
        outcome
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.unwrap(), SelectOutcome::Cleared);
    assert_eq!(second.unwrap(), SelectOutcome::Placed);

    let snapshot = assembler.snapshot().await;
    assert_eq!(
        snapshot.placed.get(&Slot::CLOTHES).map(String::as_str),
        Some("accessories_clothes_coat")
    );
    assert_eq!(snapshot.state(Slot::CLOTHES), SlotState::Placed);
    assert_eq!(snapshot.index(Slot::CLOTHES), COAT);
    assert!(!snapshot.placed.contains_key(&Slot::HEAD));
    assert!(!snapshot.collisions.any());
    assert_eq!(snapshot.pending_loads, 0);
}
