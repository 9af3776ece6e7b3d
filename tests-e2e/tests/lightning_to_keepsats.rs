//! SPEC_FULL.md §8 scenario 3: settled invoice
//! `{value_msat=5000000, memo="deposit for bob #sats"}` lands as two
//! ledger entries, `DEPOSIT_LIGHTNING` (server-side) and
//! `CUSTOM_JSON_TRANSFER` (crediting bob), with no Hive payout since the
//! memo requests Keepsats.

use ledger_commons::entry_group_id;
use ledger_commons::LedgerType;
use ledger_commons::OpType;
use ledger_store::Db;
use pipelines::custom_json_internal_transfer;
use pipelines::deposit_lightning_as_keepsats;
use pipelines::stage_one_customer_credit;
use tests_e2e::fixtures;

#[tokio::test]
async fn settled_invoice_credits_bob_as_keepsats() {
    let Some(uri) = tests_e2e::mongo_uri() else {
        eprintln!("skipping: MONGO_URI not set");
        return;
    };
    let db = Db::connect(&uri, "tests_e2e_lightning_to_keepsats").await.expect("connect to MONGO_URI");
    let ledger = db.ledger();
    let quote = fixtures::scenario_quote();

    let op_group_id = "deadbeef01";
    let short_id = "short01";
    let memo = "deposit for bob #sats";
    let value_msat = 5_000_000;

    let deposit_entry = deposit_lightning_as_keepsats(&ledger, OpType::Invoice, op_group_id, short_id, "server", "lnd-1", "bob", value_msat, memo, &quote)
        .await
        .unwrap();
    assert_eq!(deposit_entry.ledger_type, LedgerType::DepositLightning);
    assert_eq!(deposit_entry.group_id, entry_group_id(op_group_id, LedgerType::DepositLightning));

    let transfer = stage_one_customer_credit("server", "bob", value_msat, memo);
    assert_eq!(transfer.sats, 5_000);

    let credit_entry = custom_json_internal_transfer(&ledger, OpType::Invoice, op_group_id, short_id, &transfer, &quote, 10, i64::MAX)
        .await
        .unwrap();
    assert_eq!(credit_entry.ledger_type, LedgerType::CustomJsonTransfer);
    assert_eq!(credit_entry.cust_id, "server");
    assert_eq!(credit_entry.credit.sub, "bob");

    // deposit_lightning_as_keepsats is idempotent on group_id: re-running
    // stage one for the same settled invoice must not double-credit.
    let replay = deposit_lightning_as_keepsats(&ledger, OpType::Invoice, op_group_id, short_id, "server", "lnd-1", "bob", value_msat, memo, &quote)
        .await
        .unwrap();
    assert_eq!(replay.group_id, deposit_entry.group_id);
}
