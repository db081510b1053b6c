//! End-to-end scenarios: classify -> dispatch -> execute against an
//! in-memory database, checked down to the committed rows.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use bankrecon_config::Settings;
use bankrecon_core::{Action, BankMovement, DailyClose, SocialSecurityTax};
use bankrecon_db::Database;
use bankrecon_engine::{Job, RunOptions, SideChannels};
use bankrecon_test_utils::{
    applied_sum, assert_entry_balanced, close, credit_line, date, debit_line, memory_db, row_count,
    seed_ledger_credits, seed_sale_invoice, with_invoices, CARD_ACCOUNT, CASH_ACCOUNT,
    EXPENSE_ACCOUNT,
};

fn commit_options() -> RunOptions {
    RunOptions {
        dry_run: false,
        only_date: None,
        end_date: None,
    }
}

fn side_with_closes(closes: Vec<DailyClose>) -> SideChannels {
    SideChannels {
        closes: closes.into_iter().map(|c| (c.close_date, c)).collect(),
        ..SideChannels::default()
    }
}

fn run_job(
    db: Database,
    movements: Vec<BankMovement>,
    side: &mut SideChannels,
    options: &RunOptions,
) -> (Vec<bankrecon_core::LineResult>, Database) {
    let mut job = Job::new(Settings::default(), Some(db));
    let results = job
        .process_statement(movements, side, options)
        .expect("job runs");
    (results, job.into_database().expect("database handle"))
}

#[test]
fn scenario_single_card_deposit() {
    let db = memory_db();
    seed_sale_invoice(&db, 20204, dec!(725897.52), dec!(96206.15), dec!(28402.94));

    let deposit_date = date(2026, 2, 3);
    let movements = vec![credit_line(
        deposit_date,
        "CREDIT CARD SALES DEPOSIT 0099",
        dec!(215370.52),
        CARD_ACCOUNT,
    )];
    let mut side = side_with_closes(vec![close(
        date(2026, 2, 1),
        "20204",
        dec!(725897.52),
        dec!(391815.04),
        dec!(334082.48),
    )]);

    let (results, db) = run_job(db, movements, &mut side, &commit_options());

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].action, Action::Insert);
    assert_eq!(results[0].folios, vec![1]);

    // One movement, class and method per the card template, narrative
    // dated to the close.
    let (class, method, inflow, description): (String, String, String, String) = db
        .conn()
        .query_row(
            "SELECT class, payment_method, inflow, description FROM MovHeader WHERE folio = 1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .unwrap();
    assert_eq!(class, "DAILY_SALE");
    assert_eq!(method, "CreditCard");
    assert_eq!(inflow, "215370.52");
    assert_eq!(description, "DAILY SALE 01/02/2026");

    // One GLOBAL link applying the deposit amount.
    assert_eq!(row_count(&db, "MovInvoices"), 1);
    assert_eq!(applied_sum(&db, 1), dec!(215370.52));

    // Six balanced lines; debits carry deposit + VAT + excise.
    let lines: i64 = db
        .conn()
        .query_row(
            "SELECT COUNT(*) FROM LedgerEntry WHERE source_folio = 1",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(lines, 6);
    assert_entry_balanced(&db, 1);
}

#[test]
fn scenario_wire_fee_aggregation() {
    let db = memory_db();
    let fee_date = date(2026, 2, 5);

    let mut movements = Vec::new();
    for n in 0..5 {
        movements.push(debit_line(
            fee_date,
            &format!("WIRE TRANSFER FEE {n}"),
            dec!(6.00),
            CASH_ACCOUNT,
        ));
        movements.push(debit_line(
            fee_date,
            &format!("VAT ON WIRE TRANSFER FEE {n}"),
            dec!(0.96),
            CASH_ACCOUNT,
        ));
    }

    let mut side = SideChannels::default();
    let (results, db) = run_job(db, movements, &mut side, &commit_options());

    // Every fee line shares the single folio of its account group.
    assert!(results.iter().all(|r| r.action == Action::Insert));
    assert!(results.iter().all(|r| r.folios == vec![1]));

    let (outflow, kind): (String, i64) = db
        .conn()
        .query_row(
            "SELECT outflow, kind FROM MovHeader WHERE folio = 1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(outflow, "34.80");
    assert_eq!(kind, 3);

    // The fabricated purchase invoice: base 30.00, recomputed VAT 4.80,
    // DDMMYYYY reference.
    let (subtotal, vat, total, reference): (String, String, String, String) = db
        .conn()
        .query_row(
            "SELECT subtotal, vat, total, invoice_ref FROM APInvoice",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .unwrap();
    assert_eq!(subtotal, "30.00");
    assert_eq!(vat, "4.80");
    assert_eq!(total, "34.80");
    assert_eq!(reference, "05022026");
    assert_eq!(row_count(&db, "APInvoiceLine"), 1);

    let lines: i64 = db
        .conn()
        .query_row(
            "SELECT COUNT(*) FROM LedgerEntry WHERE source_folio = 1",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(lines, 4);
    assert_entry_balanced(&db, 1);
}

#[test]
fn scenario_transfer_out() {
    let db = memory_db();
    let transfer_date = date(2026, 2, 4);
    let movements = vec![debit_line(
        transfer_date,
        "(WT) TRANSFER TO ACCOUNT: 038900320016",
        dec!(500000),
        CASH_ACCOUNT,
    )];

    let mut side = SideChannels::default();
    let (results, db) = run_job(db, movements, &mut side, &commit_options());

    assert_eq!(results[0].action, Action::Insert);
    assert_eq!(results[0].folios, vec![1, 2]);

    // Out-leg on the cash account, in-leg on the card account.
    let rows: Vec<(i64, String, String, String, i64)> = db
        .conn()
        .prepare("SELECT folio, account, inflow, outflow, ledger_number FROM MovHeader ORDER BY folio")
        .unwrap()
        .query_map([], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?))
        })
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].1, CASH_ACCOUNT);
    assert_eq!(rows[0].3, "500000.00");
    assert_eq!(rows[0].4, 1); // out-leg owns the entry
    assert_eq!(rows[1].1, CARD_ACCOUNT);
    assert_eq!(rows[1].2, "500000.00");
    assert_eq!(rows[1].4, 0); // in-leg carries no entry

    // Two TRANSFER-tagged lines: Dr 1120/060000, Cr 1120/040000.
    let lines: Vec<(String, String, i64, String)> = db
        .conn()
        .prepare(
            "SELECT account, sub_account, side, doc_type FROM LedgerEntry ORDER BY position",
        )
        .unwrap()
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], ("1120".into(), "060000".into(), 1, "TRANSFER".into()));
    assert_eq!(lines[1], ("1120".into(), "040000".into(), 2, "TRANSFER".into()));
    assert_entry_balanced(&db, 1);
}

#[test]
fn scenario_idempotent_rerun() {
    let db = memory_db();
    seed_sale_invoice(&db, 20204, dec!(725897.52), dec!(96206.15), dec!(28402.94));

    let deposit = credit_line(
        date(2026, 2, 3),
        "CREDIT CARD SALES DEPOSIT 0099",
        dec!(215370.52),
        CARD_ACCOUNT,
    );
    let closes = vec![close(
        date(2026, 2, 1),
        "20204",
        dec!(725897.52),
        dec!(391815.04),
        dec!(334082.48),
    )];

    let mut side = side_with_closes(closes.clone());
    let (first, db) = run_job(db, vec![deposit.clone()], &mut side, &commit_options());
    assert_eq!(first[0].action, Action::Insert);
    assert_eq!(first[0].folios, vec![1]);

    // Second run over the same input: nothing new is written.
    let mut side = side_with_closes(closes);
    let (second, db) = run_job(db, vec![deposit], &mut side, &commit_options());
    assert_eq!(second[0].action, Action::Skip);
    assert_eq!(second[0].note, "Already registered and reconciled");
    assert!(second[0].folios.is_empty());

    assert_eq!(row_count(&db, "MovHeader"), 1);
    assert_eq!(row_count(&db, "MovInvoices"), 1);
    let entries: i64 = db
        .conn()
        .query_row("SELECT COUNT(DISTINCT ledger_number) FROM LedgerEntry", [], |r| {
            r.get(0)
        })
        .unwrap();
    assert_eq!(entries, 1);
}

#[test]
fn scenario_tdc_weekend_split() {
    let db = memory_db();
    // Global invoices so the card plans can reference them.
    seed_sale_invoice(&db, 20206, dec!(500000.00), dec!(0), dec!(0));
    seed_sale_invoice(&db, 20207, dec!(400000.00), dec!(0), dec!(0));
    seed_sale_invoice(&db, 20208, dec!(100000.00), dec!(0), dec!(0));

    let monday = date(2026, 2, 9);
    let movements = vec![
        credit_line(monday, "DEBIT CARD SALES DEPOSIT 01", dec!(300000), CARD_ACCOUNT),
        credit_line(monday, "DEBIT CARD SALES DEPOSIT 02", dec!(150000), CARD_ACCOUNT),
        credit_line(monday, "DEBIT CARD SALES DEPOSIT 03", dec!(50000), CARD_ACCOUNT),
    ];
    let mut side = side_with_closes(vec![
        close(date(2026, 2, 6), "20206", dec!(500000.00), dec!(0), dec!(250000)),
        close(date(2026, 2, 7), "20207", dec!(400000.00), dec!(0), dec!(200000)),
        close(date(2026, 2, 8), "20208", dec!(100000.00), dec!(0), dec!(50000)),
    ]);

    let (results, db) = run_job(db, movements, &mut side, &commit_options());

    assert!(results.iter().all(|r| r.action == Action::Insert));
    // The split 300000 line accrues two folios; the others one each.
    assert_eq!(results[0].folios.len(), 2);
    assert_eq!(results[1].folios.len(), 1);
    assert_eq!(results[2].folios.len(), 1);

    // Four movements were written; their inflows conserve the deposits.
    assert_eq!(row_count(&db, "MovHeader"), 4);
    let total: f64 = db
        .conn()
        .query_row("SELECT SUM(CAST(inflow AS REAL)) FROM MovHeader", [], |r| {
            r.get(0)
        })
        .unwrap();
    assert!((total - 500000.0).abs() < 0.005);

    // Friday's close received exactly its 250000 target.
    let friday: f64 = db
        .conn()
        .query_row(
            "SELECT SUM(CAST(inflow AS REAL)) FROM MovHeader WHERE description LIKE '%06/02/2026'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert!((friday - 250000.0).abs() < 0.005);

    // No bank adjustments were needed.
    let adjustments: i64 = db
        .conn()
        .query_row(
            "SELECT COUNT(*) FROM MovHeader WHERE class = 'BANK_ADJUSTMENT'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(adjustments, 0);
}

#[test]
fn scenario_tdc_leftover_becomes_adjustment() {
    let db = memory_db();
    seed_sale_invoice(&db, 20206, dec!(200000.00), dec!(0), dec!(0));
    seed_sale_invoice(&db, 20207, dec!(100000.00), dec!(0), dec!(0));

    let monday = date(2026, 2, 9);
    let movements = vec![credit_line(
        monday,
        "DEBIT CARD SALES DEPOSIT 01",
        dec!(120000),
        CARD_ACCOUNT,
    )];
    // Two closes so the multi-close path engages; their targets leave a
    // 60000 remainder unassigned.
    let mut side = side_with_closes(vec![
        close(date(2026, 2, 7), "20206", dec!(200000.00), dec!(0), dec!(40000)),
        close(date(2026, 2, 8), "20207", dec!(100000.00), dec!(0), dec!(20000)),
    ]);

    let (results, db) = run_job(db, movements, &mut side, &commit_options());

    assert_eq!(results[0].action, Action::Insert);
    // Two close slices plus the leftover adjustment.
    assert_eq!(results[0].folios.len(), 3);
    assert!(results[0].note.contains("BANK ADJUSTMENT"));

    let adjustments: i64 = db
        .conn()
        .query_row(
            "SELECT COUNT(*) FROM MovHeader WHERE class = 'BANK_ADJUSTMENT'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(adjustments, 1);
    let adjusted: String = db
        .conn()
        .query_row(
            "SELECT inflow FROM MovHeader WHERE class = 'BANK_ADJUSTMENT'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(adjusted, "60000.00");
}

#[test]
fn scenario_payroll_provision_and_check_cashed() {
    let db = memory_db();
    let movements = vec![
        debit_line(
            date(2026, 2, 13),
            "PAYROLL DISPERSION W03",
            dec!(180000.00),
            CASH_ACCOUNT,
        ),
        debit_line(
            date(2026, 2, 16),
            "CHECK CASHED:0001234",
            dec!(12500.00),
            CASH_ACCOUNT,
        ),
    ];
    let mut side = SideChannels {
        payroll: Some(bankrecon_test_utils::payroll(
            dec!(180000.00),
            dec!(12500.00),
            dec!(3200.00),
        )),
        ..SideChannels::default()
    };

    let (results, db) = run_job(db, movements, &mut side, &commit_options());

    assert_eq!(results[0].action, Action::Insert);
    assert_eq!(results[0].note, "PAYROLL DISPERSION");
    assert_eq!(results[1].action, Action::Insert);
    assert!(results[1].note.contains("check #1234"));

    // The dispersion provisions payables; the cashed check cancels its
    // bucket with a two-line entry.
    let provisioned: String = db
        .conn()
        .query_row(
            "SELECT credit FROM LedgerEntry WHERE account = '2120' AND sub_account = '040000'
             AND credit != '0.00'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(provisioned, "15700.00");

    let cancelled: String = db
        .conn()
        .query_row(
            "SELECT debit FROM LedgerEntry WHERE account = '2120' AND sub_account = '040000'
             AND debit != '0.00'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(cancelled, "12500.00");

    for folio in results.iter().flat_map(|r| r.folios.iter()) {
        let ledger: i64 = db
            .conn()
            .query_row(
                "SELECT ledger_number FROM MovHeader WHERE folio = ?1",
                [folio],
                |r| r.get(0),
            )
            .unwrap();
        assert_entry_balanced(&db, ledger);
    }
}

#[test]
fn scenario_social_security_retention() {
    let db = memory_db();
    // December 2025 credits on the retention account (the M-2 source
    // for a February 2026 payment).
    seed_ledger_credits(&db, "2140", "010000", 2025, "dec_credits", dec!(14548.30));

    let pay_date = date(2026, 2, 10);
    let movements = vec![debit_line(
        pay_date,
        "(WT) SERVICE PAYMENT SOCIAL SECURITY 5521",
        dec!(93880.17),
        CASH_ACCOUNT,
    )];
    let mut side = SideChannels {
        social_security: Some(SocialSecurityTax {
            period: "JANUARY 2026".to_string(),
            total_due: dec!(93880.17),
            ss_total: dec!(93880.17),
            retirement: Decimal::ZERO,
            unemployment_old_age: Decimal::ZERO,
            housing_fund: Decimal::ZERO,
            housing_amortization: Decimal::ZERO,
            includes_housing_fund: false,
            full_confidence: true,
            warnings: vec![],
        }),
        ..SideChannels::default()
    };

    let (results, db) = run_job(db, movements, &mut side, &commit_options());

    assert_eq!(results[0].action, Action::Insert);
    assert_eq!(results[0].folios, vec![1]);

    let lines: Vec<(String, String, String, String)> = db
        .conn()
        .prepare(
            "SELECT account, sub_account, debit, credit FROM LedgerEntry ORDER BY position",
        )
        .unwrap()
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], ("2140".into(), "010000".into(), "14548.30".into(), "0.00".into()));
    assert_eq!(lines[1], ("6200".into(), "070000".into(), "79331.87".into(), "0.00".into()));
    assert_eq!(lines[2], ("1120".into(), "040000".into(), "0.00".into(), "93880.17".into()));
    assert_entry_balanced(&db, 1);
}

#[test]
fn scenario_cash_sale_applies_individuals_then_global() {
    let db = memory_db();
    seed_sale_invoice(&db, 20190, dec!(1200.00), dec!(0), dec!(0));
    seed_sale_invoice(&db, 20191, dec!(800.00), dec!(0), dec!(0));
    seed_sale_invoice(&db, 20195, dec!(50000.00), dec!(0), dec!(0));

    let deposit_date = date(2026, 2, 6);
    let movements = vec![credit_line(
        deposit_date,
        "CASH DEPOSIT 8871",
        dec!(42000.00),
        CASH_ACCOUNT,
    )];
    let daily = with_invoices(
        close(date(2026, 2, 5), "20195", dec!(50000.00), dec!(42000.00), dec!(0)),
        &[("20190", dec!(1200.00)), ("20191", dec!(800.00))],
    );
    let mut side = side_with_closes(vec![daily]);

    let (results, db) = run_job(db, movements, &mut side, &commit_options());

    assert_eq!(results[0].action, Action::Insert);
    assert_eq!(results[0].folios, vec![1]);

    // Two INDIVIDUAL links plus the GLOBAL remainder; applications sum
    // to the movement amount.
    assert_eq!(row_count(&db, "MovInvoices"), 3);
    assert_eq!(applied_sum(&db, 1), dec!(42000.00));
    let global_applied: String = db
        .conn()
        .query_row(
            "SELECT applied FROM MovInvoices WHERE kind = 'GLOBAL'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(global_applied, "40000.00");
    assert_entry_balanced(&db, 1);
}

#[test]
fn scenario_expense_payment_settles_next_day() {
    let db = memory_db();
    // A pending purchase invoice matching the card debit.
    db.conn()
        .execute(
            "INSERT INTO APInvoice (series, number, supplier, supplier_name, date,
             subtotal, vat, total, balance, invoice_ref, status, buyer, branch,
             supplier_kind, tax_id, receipt_kind, payment_method)
             VALUES ('F', 70, '000451', 'FUEL STATION SA', '2026-02-08',
             '1000.00', '160.00', '1160.00', '1160.00', 'B-88', 'Unpaid', 'T', 5,
             'NA', 'FST010101AA0', 'EXPENSES', 'PUE')",
            [],
        )
        .unwrap();

    let debit_day = date(2026, 2, 10);
    let next_day = date(2026, 2, 11);
    let movements = vec![
        debit_line(
            debit_day,
            "POS PURCHASE GAS STATION 14",
            dec!(1160.00),
            EXPENSE_ACCOUNT,
        ),
        debit_line(next_day, "WIRE TRANSFER FEE", dec!(6.00), CASH_ACCOUNT),
    ];
    let mut side = SideChannels::default();

    let (results, db) = run_job(db, movements, &mut side, &commit_options());

    assert_eq!(results[0].action, Action::Insert);
    assert_eq!(results[0].folios.len(), 1);
    let payment_folio = results[0].folios[0];

    // The movement, its AP payment, the link, and the settled invoice.
    let (balance, status): (String, String) = db
        .conn()
        .query_row(
            "SELECT balance, status FROM APInvoice WHERE number = 70",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(balance, "0.00");
    assert_eq!(status, "Paid");

    assert_eq!(row_count(&db, "APPayment"), 1);
    let linked_folio: i64 = db
        .conn()
        .query_row("SELECT folio FROM APPaymentLink", [], |r| r.get(0))
        .unwrap();
    assert_eq!(linked_folio, payment_folio);

    // Four-line entry (the invoice carries VAT).
    let lines: i64 = db
        .conn()
        .query_row(
            "SELECT COUNT(*) FROM LedgerEntry WHERE source_folio = ?1",
            [payment_folio],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(lines, 4);
}

#[test]
fn scenario_collection_created_for_parsed_invoice() {
    let db = memory_db();
    db.conn()
        .execute(
            "INSERT INTO ARInvoice (series, number, customer, customer_name, total,
             balance, subtotal, vat, excise, status, salesperson, date)
             VALUES ('FC', 8551, '004410', 'WHOLESALE CLIENT', '46980.00', '46980.00',
             '40500.00', '6480.00', '0.00', 'Pending', 'S01', '2026-02-02')",
            [],
        )
        .unwrap();

    let movements = vec![credit_line(
        date(2026, 2, 4),
        "INCOMING WIRE RECEIVED INV: FC-8551",
        dec!(46980.00),
        CASH_ACCOUNT,
    )];
    let mut side = SideChannels::default();

    let (results, db) = run_job(db, movements, &mut side, &commit_options());

    assert_eq!(results[0].action, Action::Insert);
    assert!(results[0].note.contains("FC-8551"));

    // The collection row lands, the invoice is settled, the six-line
    // entry balances.
    assert_eq!(row_count(&db, "ARCollection"), 1);
    let (balance, status): (String, String) = db
        .conn()
        .query_row(
            "SELECT balance, status FROM ARInvoice WHERE number = 8551",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(balance, "0.00");
    assert_eq!(status, "Collected");
    assert_entry_balanced(&db, 1);
}

#[test]
fn scenario_month_edge_cash_sale_skipped() {
    let db = memory_db();
    let edge_date = date(2026, 2, 2);
    let movements = vec![credit_line(
        edge_date,
        "CASH DEPOSIT 8871",
        dec!(42000.00),
        CASH_ACCOUNT,
    )];
    let mut side = side_with_closes(vec![close(
        date(2026, 2, 1),
        "20204",
        dec!(90000.00),
        dec!(42000.00),
        dec!(0),
    )]);

    let (results, db) = run_job(db, movements, &mut side, &commit_options());

    assert_eq!(results[0].action, Action::Skip);
    assert!(results[0].note.contains("Month edge"));
    assert_eq!(row_count(&db, "MovHeader"), 0);
}

#[test]
fn scenario_cash_sale_without_close_not_processed() {
    let db = memory_db();
    let movements = vec![credit_line(
        date(2026, 2, 6),
        "CASH DEPOSIT 8871",
        dec!(42000.00),
        CASH_ACCOUNT,
    )];
    let mut side = SideChannels::default();

    let (results, _db) = run_job(db, movements, &mut side, &commit_options());
    assert_eq!(results[0].action, Action::NotProcessed);
    assert!(results[0].note.contains("No treasury close"));
}

#[test]
fn scenario_supplier_payment_settles_next_day() {
    let db = memory_db();
    // A payment captured by the purchasing module, unreconciled.
    db.conn()
        .execute(
            "INSERT INTO MovHeader (folio, bank, account, year, month, day, kind,
             inflow, outflow, description, class, sub_kind, reconciled, co, source,
             office, account_office, ledger_kind, created_by, branch, created_at, created_hour)
             VALUES (900, 'BANREGIO', '055003730017', 2026, 2, 5, 3,
             '0.00', '8421.77', 'SUPPLIER PAYMENT CAPTURED', 'SUPPLIER PAYMENTS', 'NA', 0,
             '001', 'BANK-MVMT', '01', '01', 'EXPENSE', 'T', 5, '2026-02-05', '10:00:00')",
            [],
        )
        .unwrap();

    let wire_day = date(2026, 2, 5);
    let next_day = date(2026, 2, 6);
    let movements = vec![
        debit_line(
            wire_day,
            "ACME99 SUPPLIES OUTGOING WIRE 7162",
            dec!(8421.77),
            CASH_ACCOUNT,
        ),
        // Any line on the next day so the dispatcher visits it.
        debit_line(next_day, "WIRE TRANSFER FEE", dec!(6.00), CASH_ACCOUNT),
    ];
    let mut side = SideChannels::default();

    let (results, db) = run_job(db, movements, &mut side, &commit_options());

    // The wire reconciles during the NEXT day's dispatch.
    assert_eq!(results[0].action, Action::Reconcile);
    assert_eq!(results[0].folios, vec![900]);
    assert!(results[0].note.contains("2026-02-06"));

    let reconciled: i64 = db
        .conn()
        .query_row("SELECT reconciled FROM MovHeader WHERE folio = 900", [], |r| {
            r.get(0)
        })
        .unwrap();
    assert_eq!(reconciled, 1);
}

#[test]
fn scenario_supplier_payment_pending_on_its_own_day() {
    let db = memory_db();
    let movements = vec![debit_line(
        date(2026, 2, 5),
        "ACME99 SUPPLIES OUTGOING WIRE 7162",
        dec!(8421.77),
        CASH_ACCOUNT,
    )];
    let mut side = SideChannels::default();

    let (results, _db) = run_job(db, movements, &mut side, &commit_options());
    assert_eq!(results[0].action, Action::NotProcessed);
    assert!(results[0].note.contains("Pending"));
}

#[test]
fn scenario_transfer_in_skipped() {
    let db = memory_db();
    let movements = vec![credit_line(
        date(2026, 2, 4),
        "(WT) TRANSFER RECEIVED FROM ACCOUNT 055003730017",
        dec!(500000),
        CARD_ACCOUNT,
    )];
    let mut side = SideChannels::default();

    let (results, db) = run_job(db, movements, &mut side, &commit_options());
    assert_eq!(results[0].action, Action::Skip);
    assert!(results[0].note.contains("out-leg"));
    assert_eq!(row_count(&db, "MovHeader"), 0);
}

#[test]
fn window_longer_than_seven_days_rejected() {
    let db = memory_db();
    let mut side = SideChannels::default();
    let mut job = Job::new(Settings::default(), Some(db));
    let options = RunOptions {
        dry_run: true,
        only_date: Some(date(2026, 2, 1)),
        end_date: Some(date(2026, 2, 12)),
    };
    let movements = vec![credit_line(
        date(2026, 2, 3),
        "CASH DEPOSIT",
        dec!(1.00),
        CASH_ACCOUNT,
    )];
    let err = job
        .process_statement(movements, &mut side, &options)
        .unwrap_err();
    assert!(err.to_string().contains("7 days"));
}

#[test]
fn dry_run_writes_nothing() {
    let db = memory_db();
    seed_sale_invoice(&db, 20204, dec!(725897.52), dec!(96206.15), dec!(28402.94));

    let movements = vec![credit_line(
        date(2026, 2, 3),
        "CREDIT CARD SALES DEPOSIT 0099",
        dec!(215370.52),
        CARD_ACCOUNT,
    )];
    let mut side = side_with_closes(vec![close(
        date(2026, 2, 1),
        "20204",
        dec!(725897.52),
        dec!(391815.04),
        dec!(334082.48),
    )]);

    let options = RunOptions {
        dry_run: true,
        ..RunOptions::default()
    };
    let (results, db) = run_job(db, movements, &mut side, &options);

    assert_eq!(results[0].action, Action::Insert);
    assert!(results[0].note.contains("DRY-RUN"));
    assert_eq!(row_count(&db, "MovHeader"), 0);
    assert_eq!(row_count(&db, "LedgerEntry"), 0);
}

#[test]
fn unknown_lines_stay_unknown() {
    let db = memory_db();
    let movements = vec![credit_line(
        date(2026, 2, 3),
        "SOMETHING THE RULES NEVER SAW",
        dec!(77.00),
        CASH_ACCOUNT,
    )];
    let mut side = SideChannels::default();

    let (results, db) = run_job(db, movements, &mut side, &commit_options());
    assert_eq!(results[0].action, Action::Unknown);
    assert_eq!(row_count(&db, "MovHeader"), 0);

    let summary = Job::summary(&results);
    assert_eq!(summary.count(Action::Unknown), 1);
}
