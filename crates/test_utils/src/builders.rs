//! Test Data Builders
//!
//! Builders with clinic defaults so a test only spells out the fields it
//! cares about, plus [`LedgerScenario`] for replaying a day of activity.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use domain_ledger::{
    Domain, FundMovement, FundTransaction, LedgerEngine, LedgerError, NewPosting, Transaction, Voucher,
    VoucherPosting, VoucherType,
};

use crate::fixtures::{AmountFixtures, DateFixtures, StringFixtures};

/// Builder for domain postings
#[derive(Debug, Clone)]
pub struct PostingBuilder {
    amount: Decimal,
    category: String,
    description: String,
    date: NaiveDate,
    reference: Option<(String, String)>,
    created_by: Option<String>,
}

impl Default for PostingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PostingBuilder {
    /// A test booking on the fixture business day
    pub fn new() -> Self {
        Self {
            amount: AmountFixtures::test_booking(),
            category: StringFixtures::test_category().to_string(),
            description: "Group G1".to_string(),
            date: DateFixtures::business_day(),
            reference: None,
            created_by: None,
        }
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn with_reference(mut self, reference_type: impl Into<String>, reference_id: impl Into<String>) -> Self {
        self.reference = Some((reference_type.into(), reference_id.into()));
        self
    }

    pub fn created_by(mut self, user: impl Into<String>) -> Self {
        self.created_by = Some(user.into());
        self
    }

    pub fn build(self) -> NewPosting {
        let mut posting = NewPosting::new(self.amount, self.category, self.description).dated(self.date);
        if let Some((reference_type, reference_id)) = self.reference {
            posting = posting.with_reference(reference_type, reference_id);
        }
        if let Some(user) = self.created_by {
            posting = posting.created_by(user);
        }
        posting
    }
}

/// Builder for direct Main voucher postings
#[derive(Debug, Clone)]
pub struct VoucherPostingBuilder {
    date: NaiveDate,
    amount: Decimal,
    voucher_type: VoucherType,
    source_account: Domain,
    source_transaction_type: String,
    description: String,
}

impl Default for VoucherPostingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VoucherPostingBuilder {
    /// A Hospital test-booking credit on the fixture business day
    pub fn new() -> Self {
        Self {
            date: DateFixtures::business_day(),
            amount: AmountFixtures::test_booking(),
            voucher_type: VoucherType::Credit,
            source_account: Domain::Hospital,
            source_transaction_type: StringFixtures::test_source_type().to_string(),
            description: "Group G1".to_string(),
        }
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = amount;
        self
    }

    pub fn debit(mut self) -> Self {
        self.voucher_type = VoucherType::Debit;
        self
    }

    pub fn from_account(mut self, domain: Domain) -> Self {
        self.source_account = domain;
        self
    }

    pub fn with_source_type(mut self, source_type: impl Into<String>) -> Self {
        self.source_transaction_type = source_type.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn build(self) -> VoucherPosting {
        VoucherPosting::new(
            self.date,
            self.amount,
            self.voucher_type,
            self.source_account,
            self.source_transaction_type,
            self.description,
        )
    }
}

/// One step of a [`LedgerScenario`]
#[derive(Debug, Clone)]
pub enum ScenarioStep {
    Income(Domain, NewPosting),
    Expense(Domain, NewPosting),
    /// Income merged into Main under the given source type
    IncomeWithVoucher(Domain, NewPosting, String),
    ExpenseWithVoucher(Domain, NewPosting, String),
    FundIn(Domain, FundMovement),
    FundOut(Domain, FundMovement),
}

/// What a scenario produced, in step order
#[derive(Debug, Default)]
pub struct ScenarioOutcome {
    pub transactions: Vec<Transaction>,
    pub vouchers: Vec<Voucher>,
    pub funds: Vec<FundTransaction>,
}

/// A scripted sequence of postings
///
/// # Example
///
/// ```rust,ignore
/// let outcome = LedgerScenario::new()
///     .income_with_voucher(Domain::Hospital, PostingBuilder::new().build(), "medical_test")
///     .fund_in(Domain::Hospital, FundMovement::new(dec!(100), "float"))
///     .run(&engine)
///     .await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct LedgerScenario {
    steps: Vec<ScenarioStep>,
}

impl LedgerScenario {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn income(mut self, domain: Domain, posting: NewPosting) -> Self {
        self.steps.push(ScenarioStep::Income(domain, posting));
        self
    }

    pub fn expense(mut self, domain: Domain, posting: NewPosting) -> Self {
        self.steps.push(ScenarioStep::Expense(domain, posting));
        self
    }

    pub fn income_with_voucher(mut self, domain: Domain, posting: NewPosting, source_type: &str) -> Self {
        self.steps
            .push(ScenarioStep::IncomeWithVoucher(domain, posting, source_type.to_string()));
        self
    }

    pub fn expense_with_voucher(mut self, domain: Domain, posting: NewPosting, source_type: &str) -> Self {
        self.steps
            .push(ScenarioStep::ExpenseWithVoucher(domain, posting, source_type.to_string()));
        self
    }

    pub fn fund_in(mut self, domain: Domain, movement: FundMovement) -> Self {
        self.steps.push(ScenarioStep::FundIn(domain, movement));
        self
    }

    pub fn fund_out(mut self, domain: Domain, movement: FundMovement) -> Self {
        self.steps.push(ScenarioStep::FundOut(domain, movement));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Applies every step in order, stopping at the first failure
    pub async fn run(self, engine: &LedgerEngine) -> Result<ScenarioOutcome, LedgerError> {
        let postings = &engine.postings;
        let mut outcome = ScenarioOutcome::default();
        for step in self.steps {
            match step {
                ScenarioStep::Income(domain, posting) => {
                    outcome.transactions.push(postings.add_income(domain, posting).await?);
                }
                ScenarioStep::Expense(domain, posting) => {
                    outcome.transactions.push(postings.add_expense(domain, posting).await?);
                }
                ScenarioStep::IncomeWithVoucher(domain, posting, source_type) => {
                    let (tx, voucher) = postings.post_income_with_voucher(domain, posting, &source_type).await?;
                    outcome.transactions.push(tx);
                    outcome.vouchers.push(voucher);
                }
                ScenarioStep::ExpenseWithVoucher(domain, posting, source_type) => {
                    let (tx, voucher) = postings.post_expense_with_voucher(domain, posting, &source_type).await?;
                    outcome.transactions.push(tx);
                    outcome.vouchers.push(voucher);
                }
                ScenarioStep::FundIn(domain, movement) => {
                    outcome.funds.push(postings.add_fund(domain, movement).await?);
                }
                ScenarioStep::FundOut(domain, movement) => {
                    outcome.funds.push(postings.withdraw_fund(domain, movement).await?);
                }
            }
        }
        Ok(outcome)
    }
}
