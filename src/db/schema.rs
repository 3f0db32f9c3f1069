pub const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS reviewers (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL UNIQUE,
    username TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'analyst',
    department TEXT,
    specializations TEXT NOT NULL DEFAULT '[]',
    max_assignments INTEGER NOT NULL CHECK (max_assignments > 0),
    current_assignments INTEGER NOT NULL DEFAULT 0
        CHECK (current_assignments >= 0 AND current_assignments <= max_assignments),
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS triage_services (
    id TEXT PRIMARY KEY,
    company_id TEXT NOT NULL,
    service_name TEXT NOT NULL,
    service_type TEXT NOT NULL,
    pricing_model TEXT NOT NULL,
    price_per_report INTEGER,
    monthly_price INTEGER,
    annual_price INTEGER,
    triage_level TEXT NOT NULL,
    max_reports_per_month INTEGER,
    response_time_hours INTEGER NOT NULL,
    auto_assign_triage INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subscriptions (
    id TEXT PRIMARY KEY,
    company_id TEXT NOT NULL,
    service_id TEXT NOT NULL REFERENCES triage_services(id),
    status TEXT NOT NULL DEFAULT 'active',
    reports_processed INTEGER NOT NULL DEFAULT 0,
    total_cost INTEGER NOT NULL DEFAULT 0,
    billing_cycle_start TEXT NOT NULL,
    next_billing_date TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reviews (
    id TEXT PRIMARY KEY,
    submission_id TEXT NOT NULL,
    program_id TEXT,
    reporter_id TEXT,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    submission_type TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    priority TEXT NOT NULL,
    category TEXT NOT NULL,
    severity TEXT NOT NULL,
    decision TEXT,
    decision_reason TEXT,
    internal_notes TEXT,
    public_response TEXT,
    estimated_reward INTEGER,
    actual_reward INTEGER,
    reviewer_id TEXT REFERENCES reviewers(id),
    assigned_by TEXT,
    due_date TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    audience TEXT NOT NULL DEFAULT 'moderation',
    service_id TEXT REFERENCES triage_services(id),
    review_started TEXT,
    review_completed TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CHECK ((decision IS NULL) = (status NOT IN ('approved', 'rejected'))),
    CHECK (actual_reward IS NULL OR (decision = 'accept' AND actual_reward >= 0))
);

CREATE TABLE IF NOT EXISTS comments (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    review_id TEXT NOT NULL REFERENCES reviews(id),
    author_id TEXT NOT NULL,
    content TEXT NOT NULL,
    comment_type TEXT NOT NULL,
    is_resolved INTEGER NOT NULL DEFAULT 0,
    resolved_by TEXT,
    resolved_at TEXT,
    mentions TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS audit_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    review_id TEXT NOT NULL REFERENCES reviews(id),
    actor_id TEXT NOT NULL,
    action TEXT NOT NULL,
    from_status TEXT,
    to_status TEXT NOT NULL,
    detail TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reviews_submission ON reviews(submission_id);
CREATE INDEX IF NOT EXISTS idx_reviews_status ON reviews(status);
CREATE INDEX IF NOT EXISTS idx_reviews_reviewer ON reviews(reviewer_id);
CREATE INDEX IF NOT EXISTS idx_comments_review ON comments(review_id, created_at, seq);
CREATE INDEX IF NOT EXISTS idx_audit_review ON audit_log(review_id);
CREATE INDEX IF NOT EXISTS idx_subscriptions_company ON subscriptions(company_id, service_id);
";
