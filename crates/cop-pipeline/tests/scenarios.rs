//! End-to-end scenarios over the protect / check / unprotect / share
//! pipelines, exercising the full recipient, buyer, and group flows.

use chrono::{DateTime, Utc};

use cop_core::canonical::{parse_envelope, signing_input, to_canonical_bytes};
use cop_core::error::CopError;
use cop_pipeline::{
    apply_addendum, audit_shares, buyer_sign, check, protect, prove_group_entitlement, unprotect,
    AccessPath, ProtectRequest, Sharer,
};
use cop_testkit::TestWorld;

const TRANSACTION: &[u8] = br#"{"item":"lithium","qty":100,"price":"USD 50000"}"#;

fn ts(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn trade_world() -> TestWorld {
    let mut world = TestWorld::new();
    world.add_party("Ching Chong Extractions");
    world.add_party("Lays Chips");
    world.add_party("Auditor Corp");
    world.add_party("Random Co");
    world
}

fn protect_trade(world: &TestWorld) -> cop_core::Envelope {
    let seller = world.load_party("Ching Chong Extractions");
    let request = ProtectRequest {
        buyer: "Lays Chips".into(),
        recipients: vec!["Auditor Corp".into()],
        groups: Vec::new(),
    };
    protect(TRANSACTION, &seller, &request, world.directory(), world.groups()).unwrap()
}

#[test]
fn s1_protect_check_unprotect() {
    let world = trade_world();
    let envelope = protect_trade(&world);

    let report = check(&envelope, world.directory());
    assert!(report.envelope_well_formed);
    assert!(report.seller_sig_valid);
    assert_eq!(report.buyer_sig_valid, None);
    assert!(report.failures.is_empty());

    let auditor = world.load_party("Auditor Corp");
    let opened = unprotect(&envelope, &auditor, world.directory()).unwrap();
    assert_eq!(opened.content.as_ref(), TRANSACTION);
    assert_eq!(opened.access, AccessPath::Direct);

    let random = world.load_party("Random Co");
    assert!(matches!(
        unprotect(&envelope, &random, world.directory()),
        Err(CopError::NotARecipient)
    ));
}

#[test]
fn s2_buyer_sign() {
    let world = trade_world();
    let mut envelope = protect_trade(&world);

    let buyer = world.load_party("Lays Chips");
    buyer_sign(&mut envelope, &buyer).unwrap();

    let report = check(&envelope, world.directory());
    assert_eq!(report.buyer_sig_valid, Some(true));
    assert!(report.seller_sig_valid);

    let imposter = world.load_party("Random Co");
    assert!(matches!(
        buyer_sign(&mut envelope, &imposter),
        Err(CopError::WrongBuyer)
    ));
}

#[test]
fn s3_group_snapshot_freeze() {
    let mut world = trade_world();
    world
        .groups_mut()
        .create("tech_partners", &["Auditor Corp"]);

    let seller = world.load_party("Ching Chong Extractions");
    let request = ProtectRequest {
        buyer: String::new(),
        recipients: Vec::new(),
        groups: vec!["tech_partners".into()],
    };
    let mut envelope =
        protect(TRANSACTION, &seller, &request, world.directory(), world.groups()).unwrap();

    assert_eq!(envelope.group_recipients[0].members, ["Auditor Corp"]);

    let auditor = world.load_party("Auditor Corp");

    // A bare group membership proves entitlement but does not decrypt.
    assert_eq!(prove_group_entitlement(&envelope, &auditor), ["tech_partners"]);
    assert!(matches!(
        unprotect(&envelope, &auditor, world.directory()),
        Err(CopError::NotARecipient)
    ));

    // Seller-initiated group share unlocks the protect-time member.
    let mut sharer = Sharer::new(&seller);
    let addendum = sharer
        .share_group(
            &envelope,
            "tech_partners",
            world.directory(),
            world.groups(),
            ts("2026-08-02T10:00:00Z"),
        )
        .unwrap();
    apply_addendum(&mut envelope, addendum, world.directory()).unwrap();

    let opened = unprotect(&envelope, &auditor, world.directory()).unwrap();
    assert_eq!(opened.content.as_ref(), TRANSACTION);
    assert_eq!(
        opened.access,
        AccessPath::SharedGroup {
            group_id: "tech_partners".into(),
            sharer: "Ching Chong Extractions".into(),
        }
    );

    // A member added after the share-time snapshot stays locked out.
    world
        .groups_mut()
        .add_member("tech_partners", "Lays Chips")
        .unwrap();
    let late_member = world.load_party("Lays Chips");
    assert!(matches!(
        unprotect(&envelope, &late_member, world.directory()),
        Err(CopError::NotARecipient)
    ));
}

#[test]
fn s4_tampered_ciphertext_detected() {
    let world = trade_world();
    let mut envelope = protect_trade(&world);
    envelope.content_ct[0] ^= 0x01;

    // The ciphertext is covered by the seller signature, so tampering
    // surfaces at the signature layer first; the error is in the same
    // indistinguishability class as an AEAD failure.
    let report = check(&envelope, world.directory());
    assert!(report.envelope_well_formed);
    assert!(!report.seller_sig_valid);

    let auditor = world.load_party("Auditor Corp");
    let err = unprotect(&envelope, &auditor, world.directory()).unwrap_err();
    assert!(matches!(
        err,
        CopError::SignatureInvalid | CopError::AuthFailure
    ));
    assert_eq!(err.to_string(), "cryptographic verification failed");
}

#[test]
fn s5_seller_audits_disclosures() {
    let world = trade_world();
    let mut envelope = protect_trade(&world);

    let buyer = world.load_party("Lays Chips");
    let mut sharer = Sharer::new(&buyer);
    let a1 = sharer
        .share_direct(&envelope, "Random Co", world.directory(), ts("2026-08-02T10:00:00Z"))
        .unwrap();
    apply_addendum(&mut envelope, a1, world.directory()).unwrap();

    let records: Vec<_> = envelope
        .addenda
        .iter()
        .map(|a| a.share_record.clone())
        .collect();
    let report = audit_shares(&envelope.tx_id, &records, world.directory());
    assert!(report.all_verified());
    let disclosed: Vec<&str> = report
        .disclosures
        .iter()
        .map(|d| d.disclosed_to.as_str())
        .collect();
    assert_eq!(disclosed, ["Random Co"]);
    assert_eq!(report.disclosures[0].sharer, "Lays Chips");

    // A forged record is flagged, never silently accepted.
    let mut forged = records.clone();
    forged[0].disclosed_to = "Somebody Else".into();
    let report = audit_shares(&envelope.tx_id, &forged, world.directory());
    assert!(!report.all_verified());
    assert!(report.disclosures.is_empty());
}

#[test]
fn s6_identical_inputs_independent_envelopes() {
    let world = trade_world();
    let e1 = protect_trade(&world);
    let e2 = protect_trade(&world);

    assert_ne!(e1.tx_id, e2.tx_id);
    assert_ne!(e1.content_nonce, e2.content_nonce);
    assert_ne!(e1.content_ct, e2.content_ct);
    for (w1, w2) in e1.direct_recipients.iter().zip(&e2.direct_recipients) {
        assert_ne!(w1.eph_pub, w2.eph_pub);
        assert_ne!(w1.nonce, w2.nonce);
    }

    let auditor = world.load_party("Auditor Corp");
    for envelope in [&e1, &e2] {
        let opened = unprotect(envelope, &auditor, world.directory()).unwrap();
        assert_eq!(opened.content.as_ref(), TRANSACTION);
    }
}

#[test]
fn p1_roundtrip_for_every_recipient() {
    let mut world = trade_world();
    world.add_party("Partner A");
    world.add_party("Partner B");
    world
        .groups_mut()
        .create("tech_partners", &["Partner A", "Partner B"]);

    let seller = world.load_party("Ching Chong Extractions");
    let request = ProtectRequest {
        buyer: "Lays Chips".into(),
        recipients: vec!["Auditor Corp".into()],
        groups: vec!["tech_partners".into()],
    };
    let mut envelope =
        protect(TRANSACTION, &seller, &request, world.directory(), world.groups()).unwrap();

    for name in ["Ching Chong Extractions", "Lays Chips", "Auditor Corp"] {
        let keys = world.load_party(name);
        let opened = unprotect(&envelope, &keys, world.directory()).unwrap();
        assert_eq!(opened.content.as_ref(), TRANSACTION, "direct recipient {name}");
    }

    // Group members go through the share-addendum path.
    let buyer = world.load_party("Lays Chips");
    let mut sharer = Sharer::new(&buyer);
    let addendum = sharer
        .share_group(
            &envelope,
            "tech_partners",
            world.directory(),
            world.groups(),
            ts("2026-08-02T11:00:00Z"),
        )
        .unwrap();
    apply_addendum(&mut envelope, addendum, world.directory()).unwrap();

    for name in ["Partner A", "Partner B"] {
        let keys = world.load_party(name);
        let opened = unprotect(&envelope, &keys, world.directory()).unwrap();
        assert_eq!(opened.content.as_ref(), TRANSACTION, "group member {name}");
    }
}

#[test]
fn p4_signature_binds_every_field() {
    let world = trade_world();
    let envelope = protect_trade(&world);

    let mutations: Vec<Box<dyn Fn(&mut cop_core::Envelope)>> = vec![
        Box::new(|e| e.seller = "Random Co".into()),
        Box::new(|e| e.buyer = "Random Co".into()),
        Box::new(|e| e.tx_id = cop_core::TxId::from_bytes([0u8; 16])),
        Box::new(|e| e.content_hash = cop_core::Sha256Digest::hash(b"other")),
        Box::new(|e| e.content_nonce = cop_core::AeadNonce::from_bytes([0u8; 12])),
        Box::new(|e| e.direct_recipients[0].ct[0] ^= 1),
        Box::new(|e| e.direct_recipients.swap(0, 1)),
    ];

    for (i, mutate) in mutations.iter().enumerate() {
        let mut tampered = envelope.clone();
        mutate(&mut tampered);
        // Re-serializing through the canonical codec changes nothing:
        // the signature still covers the mutated canonical form.
        let bytes = to_canonical_bytes(&tampered).unwrap();
        let reparsed = parse_envelope(&bytes).unwrap();
        assert_ne!(
            signing_input(&reparsed).unwrap(),
            signing_input(&envelope).unwrap(),
            "mutation {i} must change the signing input"
        );
        let report = check(&reparsed, world.directory());
        assert!(
            !report.seller_sig_valid || !report.envelope_well_formed,
            "mutation {i} must break verification"
        );
    }
}

#[test]
fn p5_removed_member_keeps_past_access_only() {
    let mut world = trade_world();
    world.add_party("Partner A");
    world.add_party("Partner B");
    world
        .groups_mut()
        .create("tech_partners", &["Partner A", "Partner B"]);

    let seller = world.load_party("Ching Chong Extractions");
    let request = ProtectRequest {
        buyer: "Lays Chips".into(),
        recipients: Vec::new(),
        groups: vec!["tech_partners".into()],
    };
    let mut envelope =
        protect(TRANSACTION, &seller, &request, world.directory(), world.groups()).unwrap();

    let buyer = world.load_party("Lays Chips");
    let mut sharer = Sharer::new(&buyer);

    // First share while both members are in the group.
    let first = sharer
        .share_group(
            &envelope,
            "tech_partners",
            world.directory(),
            world.groups(),
            ts("2026-08-02T10:00:00Z"),
        )
        .unwrap();
    assert_eq!(
        first.group.as_ref().unwrap().members,
        ["Partner A", "Partner B"]
    );
    apply_addendum(&mut envelope, first, world.directory()).unwrap();

    // Partner B is removed; a later share excludes it.
    world
        .groups_mut()
        .remove_member("tech_partners", "Partner B")
        .unwrap();
    let second = sharer
        .share_group(
            &envelope,
            "tech_partners",
            world.directory(),
            world.groups(),
            ts("2026-08-02T12:00:00Z"),
        )
        .unwrap();
    assert_eq!(second.group.as_ref().unwrap().members, ["Partner A"]);
    apply_addendum(&mut envelope, second, world.directory()).unwrap();

    // Past access is not revocable: the first addendum still serves B.
    let partner_b = world.load_party("Partner B");
    let opened = unprotect(&envelope, &partner_b, world.directory()).unwrap();
    assert_eq!(opened.content.as_ref(), TRANSACTION);
}

#[test]
fn p6_every_addendum_record_verifies() {
    let mut world = trade_world();
    world.add_party("Partner A");
    world.groups_mut().create("tech_partners", &["Partner A"]);

    let world = world;
    let mut envelope = protect_trade(&world);

    let buyer = world.load_party("Lays Chips");
    let mut sharer = Sharer::new(&buyer);
    let a1 = sharer
        .share_direct(&envelope, "Random Co", world.directory(), ts("2026-08-02T10:00:00Z"))
        .unwrap();
    apply_addendum(&mut envelope, a1, world.directory()).unwrap();
    let a2 = sharer
        .share_group(
            &envelope,
            "tech_partners",
            world.directory(),
            world.groups(),
            ts("2026-08-02T10:05:00Z"),
        )
        .unwrap();
    apply_addendum(&mut envelope, a2, world.directory()).unwrap();

    let report = check(&envelope, world.directory());
    assert!(report.all_valid());
    assert_eq!(report.addenda_valid, Some(true));

    // Breaking one record breaks the addendum layer, not the seller's.
    envelope.addenda[1].share_record.timestamp = ts("2026-08-02T23:00:00Z");
    let report = check(&envelope, world.directory());
    assert!(report.seller_sig_valid);
    assert_eq!(report.addenda_valid, Some(false));
}

#[test]
fn wire_roundtrip_after_full_lifecycle() {
    let mut world = trade_world();
    world.add_party("Partner A");
    world.groups_mut().create("tech_partners", &["Partner A"]);
    let world = world;

    let mut envelope = protect_trade(&world);
    let buyer = world.load_party("Lays Chips");
    buyer_sign(&mut envelope, &buyer).unwrap();

    let mut sharer = Sharer::new(&buyer);
    let addendum = sharer
        .share_group(
            &envelope,
            "tech_partners",
            world.directory(),
            world.groups(),
            ts("2026-08-02T10:00:00Z"),
        )
        .unwrap();
    apply_addendum(&mut envelope, addendum, world.directory()).unwrap();

    let bytes = to_canonical_bytes(&envelope).unwrap();
    let parsed = parse_envelope(&bytes).unwrap();
    assert_eq!(parsed, envelope);

    let report = check(&parsed, world.directory());
    assert!(report.all_valid());

    let partner = world.load_party("Partner A");
    let opened = unprotect(&parsed, &partner, world.directory()).unwrap();
    assert_eq!(opened.content.as_ref(), TRANSACTION);
}
