// Copyright (c) 2025 Tokenclip Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::Connection;
use serde_json::json;
use tempfile::tempdir;
use tokenclip::{cli, commands::exporter, db};

const WALLET: &str = "GR7NI6P62MGG3W325DGDZVGPMM4I3LR5PE4GDAFPK276NZDKYAYQ5S37";

fn base_conn() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn.execute(
        "INSERT INTO watched_wallets(address, display_name) VALUES (?1, 'Treasury')",
        [WALLET],
    )
    .unwrap();
    conn
}

#[test]
fn export_transactions_streams_pretty_json() {
    let conn = base_conn();
    conn.execute(
        "INSERT INTO ledger_transactions(id, wallet_address, transaction_at, transaction_type,
                                         token_amount, counter_amount, price, counterparty)
         VALUES ('trade-1', ?1, '2025-06-01T12:00:00+00:00', 'trade', '100', '5', '0.05',
                 'GJMSNDDUDD6KDFLEEPZHPCF2UQNUPQZIT5UEA5GENQIWEPXSK4TATGIQ')",
        [WALLET],
    )
    .unwrap();

    let dir = tempdir().unwrap();
    let out_path = dir.path().join("export.json");
    let out_str = out_path.to_string_lossy().to_string();

    let cli = cli::build_cli();
    let matches = cli.get_matches_from([
        "tokenclip",
        "export",
        "transactions",
        "--format",
        "json",
        "--out",
        &out_str,
    ]);
    if let Some(("export", export_m)) = matches.subcommand() {
        exporter::handle(&conn, export_m).unwrap();
    } else {
        panic!("no export subcommand");
    }

    let contents = std::fs::read_to_string(&out_path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(
        parsed,
        json!([
            {
                "id": "trade-1",
                "wallet": WALLET,
                "wallet_name": "Treasury",
                "date": "2025-06-01T12:00:00+00:00",
                "type": "trade",
                "token_amount": "100",
                "counter_amount": "5",
                "price": "0.05",
                "counterparty": "GJMSNDDUDD6KDFLEEPZHPCF2UQNUPQZIT5UEA5GENQIWEPXSK4TATGIQ"
            }
        ])
    );
}

#[test]
fn export_transactions_rejects_unknown_format() {
    let conn = base_conn();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("export.unknown");
    let out_str = out_path.to_string_lossy().to_string();

    let cli = cli::build_cli();
    let matches = cli.get_matches_from([
        "tokenclip",
        "export",
        "transactions",
        "--format",
        "xml",
        "--out",
        &out_str,
    ]);
    if let Some(("export", export_m)) = matches.subcommand() {
        assert!(exporter::handle(&conn, export_m).is_err());
    } else {
        panic!("no export subcommand");
    }
    assert!(!out_path.exists());
}
