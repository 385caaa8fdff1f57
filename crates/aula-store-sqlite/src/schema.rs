//! SQL schema for the Aula SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    display_name  TEXT NOT NULL,
    email         TEXT NOT NULL,
    role          TEXT NOT NULL,              -- 'student' | 'teacher' | 'admin'
    created_at    TEXT NOT NULL,
    revision      INTEGER NOT NULL DEFAULT 0  -- bumped when claims change
);

CREATE TABLE IF NOT EXISTS subjects (
    subject_id  TEXT PRIMARY KEY,
    program_id  TEXT NOT NULL,
    name        TEXT NOT NULL,
    term        INTEGER NOT NULL,
    active      INTEGER NOT NULL DEFAULT 1
);

-- program_tag may be '' or a legacy placeholder on historical rows.
CREATE TABLE IF NOT EXISTS class_groups (
    group_id     TEXT PRIMARY KEY,
    program_tag  TEXT NOT NULL DEFAULT '',
    name         TEXT NOT NULL,
    shift        TEXT NOT NULL,               -- 'morning' | 'afternoon' | 'evening'
    cycle        TEXT NOT NULL,
    active       INTEGER NOT NULL DEFAULT 1
);

-- One row per (teacher, program, subject).
CREATE TABLE IF NOT EXISTS assignments (
    assignment_id  TEXT PRIMARY KEY,
    teacher_id     TEXT NOT NULL REFERENCES users(user_id),
    program_id     TEXT NOT NULL,
    subject_id     TEXT NOT NULL REFERENCES subjects(subject_id),
    created_at     TEXT NOT NULL,
    UNIQUE (teacher_id, program_id, subject_id)
);

-- One row per claimed slot. The UNIQUE constraint is what keeps a slot
-- from being held by two teachers.
CREATE TABLE IF NOT EXISTS claims (
    assignment_id  TEXT NOT NULL REFERENCES assignments(assignment_id) ON DELETE CASCADE,
    program_id     TEXT NOT NULL,
    subject_id     TEXT NOT NULL,
    group_id       TEXT NOT NULL REFERENCES class_groups(group_id),
    claimed_at     TEXT NOT NULL,
    UNIQUE (program_id, subject_id, group_id)
);

CREATE INDEX IF NOT EXISTS users_role_idx         ON users(role);
CREATE INDEX IF NOT EXISTS subjects_program_idx   ON subjects(program_id, active);
CREATE INDEX IF NOT EXISTS assignments_teacher_idx ON assignments(teacher_id);
CREATE INDEX IF NOT EXISTS claims_assignment_idx  ON claims(assignment_id);
CREATE INDEX IF NOT EXISTS claims_group_idx       ON claims(group_id);

PRAGMA user_version = 1;
";
