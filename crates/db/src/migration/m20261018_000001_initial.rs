//! Initial database migration.
//!
//! Creates the enums, tables, and guard triggers of the approval workflow.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: TENANCY
        // ============================================================
        db.execute_unprepared(ORGANIZATIONS_SQL).await?;
        db.execute_unprepared(USERS_SQL).await?;

        // ============================================================
        // PART 3: APPROVAL RULES
        // ============================================================
        db.execute_unprepared(APPROVAL_RULES_SQL).await?;
        db.execute_unprepared(APPROVAL_STEPS_SQL).await?;

        // ============================================================
        // PART 4: EXPENSES & DECISIONS
        // ============================================================
        db.execute_unprepared(EXPENSES_SQL).await?;
        db.execute_unprepared(EXPENSE_APPROVALS_SQL).await?;
        db.execute_unprepared(EXPENSE_STATUS_TRANSITIONS_SQL).await?;

        // ============================================================
        // PART 5: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE user_role AS ENUM ('admin', 'manager', 'employee');

CREATE TYPE approval_rule_type AS ENUM ('sequential', 'percentage', 'specific', 'hybrid');

CREATE TYPE expense_status AS ENUM ('pending', 'approved', 'rejected');

CREATE TYPE approval_status AS ENUM ('pending', 'approved', 'rejected');

CREATE TYPE expense_category AS ENUM (
    'travel',
    'food',
    'office',
    'transport',
    'accommodation',
    'entertainment',
    'other'
);

CREATE TYPE transition_cause AS ENUM (
    'auto_approved_no_rule',
    'auto_approved_no_approvers',
    'evaluated',
    'direct_reject'
);
";

const ORGANIZATIONS_SQL: &str = r"
CREATE TABLE organizations (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    country VARCHAR(100) NOT NULL,
    currency CHAR(3) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_currency_format CHECK (currency ~ '^[A-Z]{3}$')
);
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    organization_id UUID REFERENCES organizations(id) ON DELETE CASCADE,
    username VARCHAR(150) NOT NULL UNIQUE,
    email VARCHAR(255) NOT NULL,
    role user_role NOT NULL DEFAULT 'employee',
    manager_id UUID REFERENCES users(id) ON DELETE SET NULL,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_not_own_manager CHECK (manager_id IS NULL OR manager_id <> id)
);

CREATE INDEX idx_users_org ON users(organization_id);
CREATE INDEX idx_users_manager ON users(manager_id) WHERE manager_id IS NOT NULL;
";

const APPROVAL_RULES_SQL: &str = r"
CREATE TABLE approval_rules (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    name VARCHAR(255) NOT NULL,
    rule_type approval_rule_type NOT NULL,
    percentage_threshold INTEGER,
    specific_approver_id UUID REFERENCES users(id) ON DELETE SET NULL,
    is_manager_first BOOLEAN NOT NULL DEFAULT false,
    is_active BOOLEAN NOT NULL DEFAULT true,
    priority SMALLINT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_threshold_range CHECK (
        percentage_threshold IS NULL OR percentage_threshold BETWEEN 1 AND 100
    )
);

CREATE INDEX idx_approval_rules_selection
    ON approval_rules(organization_id, priority, created_at)
    WHERE is_active = true;
";

const APPROVAL_STEPS_SQL: &str = r"
CREATE TABLE approval_steps (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    rule_id UUID NOT NULL REFERENCES approval_rules(id) ON DELETE CASCADE,
    approver_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    sequence INTEGER NOT NULL,

    CONSTRAINT chk_sequence_positive CHECK (sequence > 0),
    CONSTRAINT uq_approval_steps_sequence UNIQUE (rule_id, sequence)
);
";

const EXPENSES_SQL: &str = r"
CREATE TABLE expenses (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    employee_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    amount NUMERIC(10, 2) NOT NULL,
    currency CHAR(3) NOT NULL,
    amount_in_company_currency NUMERIC(19, 4) NOT NULL,
    category expense_category NOT NULL,
    description TEXT NOT NULL,
    merchant_name VARCHAR(255) NOT NULL DEFAULT '',
    expense_date DATE NOT NULL,
    status expense_status NOT NULL DEFAULT 'pending',
    approval_rule_id UUID REFERENCES approval_rules(id) ON DELETE SET NULL,
    current_step INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_amount_positive CHECK (amount > 0)
);

CREATE INDEX idx_expenses_org_status ON expenses(organization_id, status);
CREATE INDEX idx_expenses_employee ON expenses(employee_id);
";

const EXPENSE_APPROVALS_SQL: &str = r"
CREATE TABLE expense_approvals (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    expense_id UUID NOT NULL REFERENCES expenses(id) ON DELETE CASCADE,
    approver_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    status approval_status NOT NULL DEFAULT 'pending',
    comment TEXT NOT NULL DEFAULT '',
    step_number INTEGER NOT NULL,
    decided_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT uq_expense_approvals_seat UNIQUE (expense_id, approver_id, step_number)
);

CREATE INDEX idx_expense_approvals_pending
    ON expense_approvals(approver_id)
    WHERE status = 'pending';
";

const EXPENSE_STATUS_TRANSITIONS_SQL: &str = r"
CREATE TABLE expense_status_transitions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    expense_id UUID NOT NULL REFERENCES expenses(id) ON DELETE CASCADE,
    from_status expense_status NOT NULL,
    to_status expense_status NOT NULL,
    cause transition_cause NOT NULL,
    actor_id UUID REFERENCES users(id) ON DELETE SET NULL,
    occurred_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_expense_transitions_expense ON expense_status_transitions(expense_id, occurred_at);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_finalized_expense_change
-- Approved and rejected expenses never change status again
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_finalized_expense_change()
RETURNS TRIGGER AS $$
BEGIN
    IF OLD.status <> 'pending' AND NEW.status <> OLD.status THEN
        RAISE EXCEPTION 'Cannot change status of % expense', OLD.status;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_finalized_expense_change
BEFORE UPDATE ON expenses
FOR EACH ROW
EXECUTE FUNCTION prevent_finalized_expense_change();

-- ============================================================
-- FUNCTION: freeze_decided_approval
-- A decision timestamp is written once
-- ============================================================
CREATE OR REPLACE FUNCTION freeze_decided_approval()
RETURNS TRIGGER AS $$
BEGIN
    IF OLD.decided_at IS NOT NULL AND (
        NEW.decided_at IS DISTINCT FROM OLD.decided_at OR NEW.status <> OLD.status
    ) THEN
        RAISE EXCEPTION 'Approval % was already decided', OLD.id;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_freeze_decided_approval
BEFORE UPDATE ON expense_approvals
FOR EACH ROW
EXECUTE FUNCTION freeze_decided_approval();
";

const DROP_ALL_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_freeze_decided_approval ON expense_approvals;
DROP TRIGGER IF EXISTS trg_prevent_finalized_expense_change ON expenses;
DROP FUNCTION IF EXISTS freeze_decided_approval();
DROP FUNCTION IF EXISTS prevent_finalized_expense_change();

-- Drop tables (reverse order of creation)
DROP TABLE IF EXISTS expense_status_transitions CASCADE;
DROP TABLE IF EXISTS expense_approvals CASCADE;
DROP TABLE IF EXISTS expenses CASCADE;
DROP TABLE IF EXISTS approval_steps CASCADE;
DROP TABLE IF EXISTS approval_rules CASCADE;
DROP TABLE IF EXISTS users CASCADE;
DROP TABLE IF EXISTS organizations CASCADE;

-- Drop enums
DROP TYPE IF EXISTS transition_cause CASCADE;
DROP TYPE IF EXISTS expense_category CASCADE;
DROP TYPE IF EXISTS approval_status CASCADE;
DROP TYPE IF EXISTS expense_status CASCADE;
DROP TYPE IF EXISTS approval_rule_type CASCADE;
DROP TYPE IF EXISTS user_role CASCADE;
";
