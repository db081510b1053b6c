//! Tax processor: federal filings, state payroll tax and social
//! security.
//!
//! Statement amounts are matched against the parsed filings; nothing is
//! generated unless the loader flagged full confidence. The
//! social-security retention figure comes from the ledger balance two
//! calendar months before the payment date (the M-2 rule), crossing the
//! year boundary when needed.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use bankrecon_config::{AccountRegistry, LedgerAccounts};
use bankrecon_core::{
    BankMovement, ExecutionPlan, FederalTax, LedgerKind, LedgerLine, MovementKind, MovementRow,
    ProcessKind, SocialSecurityTax, StateTax, VatRetention,
};
use bankrecon_db::{queries, Database};

pub const PLAN_KIND: &str = "TAXES";
pub const CLASS_FEDERAL: &str = "TAX PAYMENT";
pub const CLASS_STATE: &str = "STATE PAYROLL TAX";
pub const CLASS_SOCIAL_SECURITY: &str = "SS PAYMENT";

/// Build the plan for one day's tax lines across the three sub-flows.
pub fn build_plan(
    movements: &[BankMovement],
    date: NaiveDate,
    federal: Option<&FederalTax>,
    state: Option<&StateTax>,
    social: Option<&SocialSecurityTax>,
    db: Option<&Database>,
    registry: &AccountRegistry,
) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new(PLAN_KIND, format!("Taxes {date}"), date);

    if movements.is_empty() {
        plan.warn("No tax movements for this day");
        return plan;
    }

    let federal_lines: Vec<&BankMovement> = movements
        .iter()
        .filter(|m| m.kind_or_unknown() == ProcessKind::TaxFederal)
        .collect();
    let state_lines: Vec<&BankMovement> = movements
        .iter()
        .filter(|m| m.kind_or_unknown() == ProcessKind::TaxState)
        .collect();
    let social_lines: Vec<&BankMovement> = movements
        .iter()
        .filter(|m| m.kind_or_unknown() == ProcessKind::TaxSocialSecurity)
        .collect();

    if !federal_lines.is_empty() {
        build_federal(&mut plan, &federal_lines, date, federal, registry);
    }
    if !state_lines.is_empty() {
        build_state(&mut plan, &state_lines, date, state, registry);
    }
    if !social_lines.is_empty() {
        build_social_security(&mut plan, &social_lines, date, social, db, registry);
    }

    plan
}

fn tax_movement(
    registry: &AccountRegistry,
    date: NaiveDate,
    amount: Decimal,
    description: String,
    class: &str,
) -> MovementRow {
    let cash = registry.cash();
    let (year, month, day) = MovementRow::date_fields(date);
    MovementRow {
        bank: cash.bank.clone(),
        account: cash.number.clone(),
        year,
        month,
        day,
        kind: MovementKind::ManualExpense,
        outflow: amount,
        description,
        class: class.to_string(),
        expense_kind: "TRANSFER".to_string(),
        ledger_kind: LedgerKind::Expense,
        ..MovementRow::default()
    }
}

// --- Federal -------------------------------------------------------------

fn build_federal(
    plan: &mut ExecutionPlan,
    movements: &[&BankMovement],
    date: NaiveDate,
    federal: Option<&FederalTax>,
    registry: &AccountRegistry,
) {
    let Some(data) = federal else {
        plan.warn("No federal filing data; federal movements not generated");
        return;
    };
    if !data.full_confidence {
        plan.warn("Federal filing below full confidence; movements not generated");
        for w in &data.warnings {
            plan.warn(format!("  filing: {w}"));
        }
        return;
    }

    // Match statement lines to the filing's amounts.
    let principal = data.second_return_principal();
    let mut first_return = None;
    let mut second_principal = None;
    let mut retention_hits: Vec<&VatRetention> = Vec::new();

    for movement in movements {
        let amount = movement.amount();
        if amount == data.first_return_total && first_return.is_none() {
            first_return = Some(*movement);
        } else if amount == principal && second_principal.is_none() {
            second_principal = Some(*movement);
        } else if let Some(retention) = data
            .vat_retentions
            .iter()
            .find(|r| r.amount == amount && !retention_hits.iter().any(|h| std::ptr::eq(*h, *r)))
        {
            retention_hits.push(retention);
        } else if amount == data.second_return_total && second_principal.is_none() {
            // Fallback: the full second-return total on one line.
            second_principal = Some(*movement);
        }
    }

    if first_return.is_some() {
        push_first_return(plan, date, data, registry);
        plan.validate_note(format!(
            "Federal first return: {:.2} (ISR fees {:.2} + ISR rental {:.2} + excise {:.2})",
            data.first_return_total,
            data.isr_retention_fees,
            data.isr_retention_rental,
            data.excise_net
        ));
    } else {
        plan.warn(format!(
            "No statement line for the first federal return ({:.2})",
            data.first_return_total
        ));
    }

    if second_principal.is_some() {
        push_second_return_principal(plan, date, data, registry);
        plan.validate_note(format!(
            "Federal second return principal: {principal:.2} (corporate {:.2} + salary ret {:.2})",
            data.corporate_isr, data.salary_isr_retention
        ));
    } else {
        plan.warn(format!(
            "No statement line for the second federal return principal ({principal:.2})"
        ));
    }

    for retention in &retention_hits {
        push_vat_retention(plan, date, retention, &data.period, registry);
        plan.validate_note(format!(
            "Federal VAT retention: {} {:.2}",
            retention.name, retention.amount
        ));
    }
    for retention in &data.vat_retentions {
        if !retention_hits.iter().any(|h| std::ptr::eq(*h, retention)) {
            plan.warn(format!(
                "VAT retention {} ({:.2}) has no statement line",
                retention.name, retention.amount
            ));
        }
    }
}

/// First return (retentions + excise): 5 lines.
fn push_first_return(
    plan: &mut ExecutionPlan,
    date: NaiveDate,
    data: &FederalTax,
    registry: &AccountRegistry,
) {
    let period = &data.period;
    let description = format!("TAX PAYMENT (RETENTIONS) {period}");
    plan.movements.push(tax_movement(
        registry,
        date,
        data.first_return_total,
        description.clone(),
        CLASS_FEDERAL,
    ));

    let cash = registry.cash();
    plan.ledger_lines.extend([
        LedgerLine::debit(
            1,
            LedgerAccounts::ISR_RETENTION_FEES,
            data.isr_retention_fees,
            format!("ISR retention fees {period}"),
        ),
        LedgerLine::debit(
            2,
            LedgerAccounts::ISR_RETENTION_RENTAL,
            data.isr_retention_rental,
            format!("ISR retention 10% rental {period}"),
        ),
        LedgerLine::credit(3, cash.ledger_pair(), data.first_return_total, format!("Bank {description}")),
        LedgerLine::debit(
            4,
            LedgerAccounts::EXCISE_COLLECTED,
            data.excise_gross,
            format!("Excise collected {period}"),
        ),
        LedgerLine::credit(
            5,
            LedgerAccounts::EXCISE_PAID,
            data.excise_creditable,
            format!("Excise creditable paid {period}"),
        ),
    ]);
    plan.invoices_per_movement.push(0);
    plan.lines_per_movement.push(5);
}

/// Second return principal (corporate ISR + salary retention + the VAT
/// reclassification): 6 lines.
fn push_second_return_principal(
    plan: &mut ExecutionPlan,
    date: NaiveDate,
    data: &FederalTax,
    registry: &AccountRegistry,
) {
    let period = &data.period;
    let description = format!("TAX PAYMENT ISR AND VAT {period}");
    let amount = data.second_return_principal();
    plan.movements
        .push(tax_movement(registry, date, amount, description.clone(), CLASS_FEDERAL));

    let cash = registry.cash();
    plan.ledger_lines.extend([
        LedgerLine::debit(
            1,
            LedgerAccounts::ISR_PROVISIONAL,
            data.corporate_isr,
            format!("Provisional ISR payment {period}"),
        ),
        LedgerLine::debit(
            2,
            LedgerAccounts::RETENTION_ISR,
            data.salary_isr_retention,
            format!("Salary ISR retention {period}"),
        ),
        LedgerLine::credit(3, cash.ledger_pair(), amount, format!("Bank {description}")),
        LedgerLine::debit(
            4,
            LedgerAccounts::VAT_COLLECTED,
            data.vat_collected,
            format!("VAT collected {period}"),
        ),
        LedgerLine::credit(
            5,
            LedgerAccounts::VAT_PAID,
            data.vat_creditable,
            format!("VAT creditable paid {period}"),
        ),
        LedgerLine::debit(
            6,
            LedgerAccounts::VAT_IN_FAVOUR,
            data.vat_in_favour,
            format!("VAT in favour {period}"),
        ),
    ]);
    plan.invoices_per_movement.push(0);
    plan.lines_per_movement.push(6);
}

/// Per-supplier VAT retention: 4 lines.
fn push_vat_retention(
    plan: &mut ExecutionPlan,
    date: NaiveDate,
    retention: &VatRetention,
    period: &str,
    registry: &AccountRegistry,
) {
    let description = format!("TAX PAYMENT VAT RETENTIONS {period}");
    plan.movements.push(tax_movement(
        registry,
        date,
        retention.amount,
        description.clone(),
        CLASS_FEDERAL,
    ));

    let cash = registry.cash();
    plan.ledger_lines.extend([
        LedgerLine::debit(
            1,
            LedgerAccounts::VAT_WITHHELD_PAID,
            retention.amount,
            format!("VAT withheld {} {period}", retention.name),
        ),
        LedgerLine::credit(2, cash.ledger_pair(), retention.amount, format!("Bank {description}")),
        LedgerLine::debit(
            3,
            LedgerAccounts::VAT_PAID,
            retention.amount,
            format!("VAT creditable {} {period}", retention.name),
        ),
        LedgerLine::credit(
            4,
            LedgerAccounts::VAT_PENDING_PAYMENT,
            retention.amount,
            format!("VAT pending payment {} {period}", retention.name),
        ),
    ]);
    plan.invoices_per_movement.push(0);
    plan.lines_per_movement.push(4);
}

// --- State ---------------------------------------------------------------

fn build_state(
    plan: &mut ExecutionPlan,
    movements: &[&BankMovement],
    date: NaiveDate,
    state: Option<&StateTax>,
    registry: &AccountRegistry,
) {
    let Some(data) = state else {
        plan.warn("No state filing data; state movement not generated");
        return;
    };
    if !data.full_confidence {
        plan.warn("State filing below full confidence; movement not generated");
        for w in &data.warnings {
            plan.warn(format!("  filing: {w}"));
        }
        return;
    }

    if !movements.iter().any(|m| m.amount() == data.amount) {
        plan.warn(format!(
            "No statement line for the state payroll tax ({:.2})",
            data.amount
        ));
        return;
    }

    let period = &data.period;
    let description = format!("STATE PAYROLL TAX {period}");
    plan.movements
        .push(tax_movement(registry, date, data.amount, description.clone(), CLASS_STATE));

    let cash = registry.cash();
    plan.ledger_lines.extend([
        LedgerLine::debit(
            1,
            LedgerAccounts::STATE_PAYROLL_TAX,
            data.amount,
            format!("State payroll tax {period}"),
        ),
        LedgerLine::credit(2, cash.ledger_pair(), data.amount, format!("Bank {description}")),
    ]);
    plan.invoices_per_movement.push(0);
    plan.lines_per_movement.push(2);

    plan.validate_note(format!("State payroll tax: {:.2} {period}", data.amount));
}

// --- Social security -----------------------------------------------------

/// The ledger month the retention accumulated in: two calendar months
/// before the payment date, rolling across the year boundary.
pub fn retention_period(date: NaiveDate) -> (i32, u32) {
    let mut month = date.month() as i32 - 2;
    let mut year = date.year();
    if month <= 0 {
        month += 12;
        year -= 1;
    }
    (year, month as u32)
}

fn build_social_security(
    plan: &mut ExecutionPlan,
    movements: &[&BankMovement],
    date: NaiveDate,
    social: Option<&SocialSecurityTax>,
    db: Option<&Database>,
    registry: &AccountRegistry,
) {
    let Some(data) = social else {
        plan.warn("No social-security settlement data; movement not generated");
        return;
    };
    if !data.full_confidence {
        plan.warn("Social-security settlement below full confidence; movement not generated");
        for w in &data.warnings {
            plan.warn(format!("  filing: {w}"));
        }
        return;
    }

    if !movements.iter().any(|m| m.amount() == data.total_due) {
        plan.warn(format!(
            "No statement line for the social-security payment ({:.2})",
            data.total_due
        ));
        return;
    }

    let Some(db) = db else {
        plan.warn("Social-security retention needs the ledger balance; no database connection");
        return;
    };
    let (year, month) = retention_period(date);
    let (account, sub_account) = LedgerAccounts::RETENTION_SOCIAL_SECURITY;
    let retention = match queries::monthly_ledger_credits(db.conn(), account, sub_account, year, month)
    {
        Ok(Some(value)) => value,
        Ok(None) => {
            plan.warn(format!(
                "No ledger balance row for {account}/{sub_account} period {year}, month {month}"
            ));
            return;
        }
        Err(e) => {
            plan.warn(format!("Ledger balance query failed: {e}"));
            return;
        }
    };

    let expense = data.ss_total - retention;
    if expense < Decimal::ZERO {
        plan.warn(format!(
            "Retention ({retention:.2}) exceeds the SS total ({:.2}); negative expense",
            data.ss_total
        ));
        return;
    }

    if data.includes_housing_fund {
        push_social_security_bimonthly(plan, date, data, retention, expense, registry);
    } else {
        push_social_security_monthly(plan, date, data, retention, expense, registry);
    }
}

/// Monthly settlement: 3 lines (retention, expense, bank).
fn push_social_security_monthly(
    plan: &mut ExecutionPlan,
    date: NaiveDate,
    data: &SocialSecurityTax,
    retention: Decimal,
    expense: Decimal,
    registry: &AccountRegistry,
) {
    let period = &data.period;
    let description = format!("SS CONTRIBUTION PAYMENT {period}");
    plan.movements.push(tax_movement(
        registry,
        date,
        data.total_due,
        description.clone(),
        CLASS_SOCIAL_SECURITY,
    ));

    let cash = registry.cash();
    plan.ledger_lines.extend([
        LedgerLine::debit(
            1,
            LedgerAccounts::RETENTION_SOCIAL_SECURITY,
            retention,
            format!("SS retention {period}"),
        ),
        LedgerLine::debit(
            2,
            LedgerAccounts::SOCIAL_SECURITY_EXPENSE,
            expense,
            format!("SS employer expense {period}"),
        ),
        LedgerLine::credit(3, cash.ledger_pair(), data.total_due, format!("Bank {description}")),
    ]);
    plan.invoices_per_movement.push(0);
    plan.lines_per_movement.push(3);

    plan.validate_note(format!(
        "SS monthly: {:.2} = retention {retention:.2} + expense {expense:.2}",
        data.total_due
    ));
}

/// Bimonthly settlement including the housing fund: 7 lines.
fn push_social_security_bimonthly(
    plan: &mut ExecutionPlan,
    date: NaiveDate,
    data: &SocialSecurityTax,
    retention: Decimal,
    expense: Decimal,
    registry: &AccountRegistry,
) {
    let period = &data.period;
    let description = format!("SS AND HOUSING FUND PAYMENT {period}");
    plan.movements.push(tax_movement(
        registry,
        date,
        data.total_due,
        description.clone(),
        CLASS_SOCIAL_SECURITY,
    ));

    let cash = registry.cash();
    plan.ledger_lines.extend([
        LedgerLine::debit(
            1,
            LedgerAccounts::RETENTION_SOCIAL_SECURITY,
            retention,
            format!("SS retention {period}"),
        ),
        LedgerLine::debit(
            2,
            LedgerAccounts::SOCIAL_SECURITY_EXPENSE,
            expense,
            format!("SS employer expense {period}"),
        ),
        LedgerLine::debit(
            3,
            LedgerAccounts::RETIREMENT_2PCT,
            data.retirement,
            format!("2% retirement contribution {period}"),
        ),
        LedgerLine::debit(
            4,
            LedgerAccounts::UNEMPLOYMENT_OLD_AGE,
            data.unemployment_old_age,
            format!("Unemployment and old age {period}"),
        ),
        LedgerLine::debit(
            5,
            LedgerAccounts::HOUSING_FUND_5PCT,
            data.housing_fund,
            format!("5% housing fund {period}"),
        ),
        LedgerLine::debit(
            6,
            LedgerAccounts::RETENTION_HOUSING_FUND,
            data.housing_amortization,
            format!("Housing-fund amortization retention {period}"),
        ),
        LedgerLine::credit(7, cash.ledger_pair(), data.total_due, format!("Bank {description}")),
    ]);
    plan.invoices_per_movement.push(0);
    plan.lines_per_movement.push(7);

    plan.validate_note(format!(
        "SS+housing: {:.2} = retention {retention:.2} + expense {expense:.2} + retirement {:.2} \
         + unemployment {:.2} + housing {:.2} + amortization {:.2}",
        data.total_due,
        data.retirement,
        data.unemployment_old_age,
        data.housing_fund,
        data.housing_amortization
    ));
}
