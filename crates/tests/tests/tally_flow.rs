// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use actix::{Actor, Addr};
use alloy_primitives::{Address, U256};
use anyhow::Result;
use confide_aggregator::{
    CloseBatch, DecryptionCallback, GetBatch, GetDecryptionContext, GetRevealedTally,
    OpenNextBatch, Pause, RequestDecryption, Submit, TallyCoordinator, TallyError, Unpause,
};
use confide_config::AppConfig;
use confide_entrypoint::start::{build_fhe, execute};
use confide_events::{
    BatchId, Event, EventBus, FailureKind, GetErrors, HistoryCollector, RequestId, TakeEvents,
    TallyEvent,
};
use confide_test_helpers::{add_tracing, rand_eth_addr, BfvSetup};
use confide_utils::{create_shared_rng_from_u64, ArcBytes};

struct System {
    tally: Addr<TallyCoordinator>,
    history: Addr<HistoryCollector<TallyEvent>>,
    errors: Addr<HistoryCollector<TallyEvent>>,
    bfv: BfvSetup,
    admin: Address,
    alice: Address,
    bob: Address,
}

fn system(cooldown_secs: u64) -> Result<System> {
    let rng = create_shared_rng_from_u64(42);
    let admin = rand_eth_addr(&rng);
    let alice = rand_eth_addr(&rng);
    let bob = rand_eth_addr(&rng);

    let config = AppConfig {
        system_tag: rand_eth_addr(&rng),
        administrator: admin,
        providers: vec![alice, bob],
        cooldown_secs,
        ..AppConfig::default()
    };
    let bfv = BfvSetup::new(build_fhe(&config.bfv)?, &rng, [9u8; 32])?;

    let bus = EventBus::<TallyEvent>::default().start();
    let history = EventBus::history(&bus);
    let errors = EventBus::error(&bus, "TallyFailure");

    let tally = execute(
        &config,
        bfv.fhe.clone(),
        Box::new(bfv.authority.clone()),
        &bus,
    )?
    .tally;

    Ok(System {
        tally,
        history,
        errors,
        bfv,
        admin,
        alice,
        bob,
    })
}

impl System {
    fn submission(
        &self,
        caller: Address,
        batch_id: BatchId,
        score: u64,
        weight: u64,
        now: u64,
    ) -> Result<Submit> {
        Ok(Submit {
            caller,
            batch_id,
            encrypted_score: self.bfv.encrypt(score)?,
            encrypted_weight: self.bfv.encrypt(weight)?,
            now,
        })
    }

    async fn close_and_request(&self, batch_id: BatchId, now: u64) -> Result<RequestId> {
        self.tally
            .send(CloseBatch {
                caller: self.admin,
                batch_id,
            })
            .await??;
        let request_id = self
            .tally
            .send(RequestDecryption {
                caller: self.admin,
                batch_id,
                now,
            })
            .await??;
        Ok(request_id)
    }
}

#[actix::test]
#[serial_test::serial]
async fn scenario_reveals_the_aggregate_once() -> Result<()> {
    let _guard = add_tracing("info");
    let s = system(0)?;

    s.tally.send(s.submission(s.alice, 1, 10, 1, 0)?).await??;
    s.tally.send(s.submission(s.bob, 1, 20, 1, 0)?).await??;
    let request_id = s.close_and_request(1, 0).await?;

    let callback = s.bfv.authority.fulfil(request_id)?;
    let revealed = s.tally.send(callback.clone()).await??;
    assert_eq!(revealed.score, U256::from(30u64));
    assert_eq!(revealed.weight, U256::from(2u64));
    // The weighted mean is computed downstream from the two totals
    assert_eq!(revealed.score / revealed.weight, U256::from(15u64));

    assert!(s
        .tally
        .send(GetDecryptionContext(request_id))
        .await?
        .is_some_and(|c| c.processed));
    assert_eq!(s.tally.send(GetRevealedTally(1)).await?, Some(revealed));

    // Delivering the identical callback again is a replay
    assert_eq!(
        s.tally.send(callback).await?,
        Err(TallyError::ReplayDetected(request_id))
    );

    let events = s.history.send(TakeEvents::new(9)).await?;
    assert_eq!(
        events.iter().map(|e| e.event_type()).collect::<Vec<_>>(),
        vec![
            "ProviderAdded",
            "ProviderAdded",
            "BatchOpened",
            "SubmissionAccepted",
            "SubmissionAccepted",
            "BatchClosed",
            "DecryptionRequested",
            "DecryptionCompleted",
            "TallyFailure",
        ]
    );
    let errors = s.errors.send(GetErrors::new()).await?;
    assert_eq!(errors.len(), 1);
    assert!(errors[0].kind.is_attack_indicator());
    Ok(())
}

#[actix::test]
#[serial_test::serial]
async fn cooldown_blocks_rapid_resubmission() -> Result<()> {
    let s = system(60)?;
    s.tally.send(s.submission(s.alice, 1, 1, 1, 1_000)?).await??;

    let early = s.tally.send(s.submission(s.alice, 1, 1, 1, 1_010)?).await?;
    assert_eq!(early, Err(TallyError::CooldownActive { retry_at: 1_060 }));

    assert_eq!(
        s.tally.send(s.submission(s.alice, 1, 1, 1, 1_060)?).await??,
        2
    );
    Ok(())
}

#[actix::test]
#[serial_test::serial]
async fn invalid_proof_leaves_the_request_open() -> Result<()> {
    let s = system(0)?;
    s.tally.send(s.submission(s.alice, 1, 4, 1, 0)?).await??;
    let request_id = s.close_and_request(1, 0).await?;

    let valid = s.bfv.authority.fulfil(request_id)?;
    let forged = DecryptionCallback {
        proof: ArcBytes::from_bytes(vec![0u8; 32]),
        ..valid.clone()
    };
    assert_eq!(
        s.tally.send(forged).await?,
        Err(TallyError::InvalidProof(request_id))
    );
    assert!(s
        .tally
        .send(GetDecryptionContext(request_id))
        .await?
        .is_some_and(|c| !c.processed));

    let revealed = s.tally.send(valid).await??;
    assert_eq!(revealed.score, U256::from(4u64));

    let errors = s.errors.send(GetErrors::new()).await?;
    assert_eq!(
        errors.iter().map(|e| e.kind).collect::<Vec<_>>(),
        vec![FailureKind::InvalidProof]
    );
    Ok(())
}

#[actix::test]
#[serial_test::serial]
async fn batches_roll_over() -> Result<()> {
    let s = system(0)?;
    s.tally.send(s.submission(s.alice, 1, 7, 1, 0)?).await??;
    s.close_and_request(1, 0).await?;

    assert_eq!(
        s.tally.send(s.submission(s.bob, 1, 1, 1, 0)?).await?,
        Err(TallyError::BatchClosed(1))
    );
    assert_eq!(s.tally.send(OpenNextBatch { caller: s.admin }).await??, 2);
    assert_eq!(
        s.tally.send(s.submission(s.bob, 1, 1, 1, 0)?).await?,
        Err(TallyError::InvalidBatch(1))
    );

    s.tally.send(Pause { caller: s.admin }).await??;
    assert_eq!(
        s.tally.send(s.submission(s.bob, 2, 1, 1, 0)?).await?,
        Err(TallyError::SystemPaused)
    );
    s.tally.send(Unpause { caller: s.admin }).await??;
    s.tally.send(s.submission(s.bob, 2, 1, 1, 0)?).await??;

    let batch_one = s.tally.send(GetBatch(1)).await?;
    assert!(batch_one.is_some_and(|b| b.submissions == 1 && !b.is_open));
    let batch_two = s.tally.send(GetBatch(2)).await?;
    assert!(batch_two.is_some_and(|b| b.submissions == 1 && b.is_open));
    Ok(())
}

#[actix::test]
#[serial_test::serial]
async fn bfv_aggregate_does_not_depend_on_arrival_order() -> Result<()> {
    let s = system(0)?;
    let rng = create_shared_rng_from_u64(7);
    let tag = rand_eth_addr(&rng);
    let config = AppConfig {
        system_tag: tag,
        administrator: s.admin,
        providers: vec![s.alice, s.bob],
        cooldown_secs: 0,
        ..AppConfig::default()
    };
    let bus = EventBus::<TallyEvent>::default().start();
    let other = execute(
        &config,
        s.bfv.fhe.clone(),
        Box::new(s.bfv.authority.clone()),
        &bus,
    )?
    .tally;

    let first = s.submission(s.alice, 1, 3, 1, 0)?;
    let second = s.submission(s.bob, 1, 5, 2, 0)?;
    let third = s.submission(s.alice, 1, 11, 1, 0)?;

    for msg in [first.clone(), second.clone(), third.clone()] {
        s.tally.send(msg).await??;
    }
    for msg in [third, first, second] {
        other.send(msg).await??;
    }

    let a = s.tally.send(GetBatch(1)).await?.map(|b| b.totals);
    let b = other.send(GetBatch(1)).await?.map(|b| b.totals);
    assert!(a.is_some());
    assert_eq!(a, b);
    Ok(())
}

#[actix::test]
#[serial_test::serial]
async fn empty_batch_reveals_zero() -> Result<()> {
    let s = system(0)?;
    let request_id = s.close_and_request(1, 0).await?;

    let revealed = s.tally.send(s.bfv.authority.fulfil(request_id)?).await??;
    assert_eq!(revealed.score, U256::ZERO);
    assert_eq!(revealed.weight, U256::ZERO);
    assert!(s
        .tally
        .send(GetBatch(1))
        .await?
        .is_some_and(|b| b.submissions == 0 && b.revealed.is_some()));
    Ok(())
}

#[actix::test]
#[serial_test::serial]
async fn multiplied_ciphertext_is_rejected_without_stopping_the_tally() -> Result<()> {
    let s = system(0)?;
    let fresh = s.bfv.encrypt(2)?;
    let product = s.bfv.encrypt_with_extra_part(2)?;

    let rejected = s
        .tally
        .send(Submit {
            caller: s.alice,
            batch_id: 1,
            encrypted_score: product,
            encrypted_weight: fresh.clone(),
            now: 0,
        })
        .await?;
    assert!(matches!(rejected, Err(TallyError::InvalidCiphertext(_))));

    // The coordinator is still serving and the batch is untouched
    assert_eq!(s.tally.send(s.submission(s.bob, 1, 5, 1, 0)?).await??, 1);
    Ok(())
}
