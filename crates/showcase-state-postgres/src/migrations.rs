/// Generate SQL migrations for the PostgreSQL flow store
///
/// The first migration creates the reference tables the resolvers read from,
/// the second the flow aggregate itself. `seq` columns record insertion
/// order for flows, persona links and actions.
pub fn generate_migrations() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "20240501000000_reference_tables",
            r#"
            CREATE TABLE IF NOT EXISTS assets (
                id UUID PRIMARY KEY,
                media_type TEXT NOT NULL,
                file_name TEXT,
                description TEXT,
                content BYTEA NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );

            CREATE TABLE IF NOT EXISTS personas (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                role TEXT NOT NULL,
                description TEXT,
                headshot_image UUID REFERENCES assets(id) ON DELETE SET NULL,
                body_image UUID REFERENCES assets(id) ON DELETE SET NULL
            );

            CREATE TABLE IF NOT EXISTS owners (
                id UUID PRIMARY KEY,
                kind TEXT NOT NULL CHECK (kind IN ('ISSUER', 'RELYING_PARTY')),
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                organization TEXT,
                logo UUID REFERENCES assets(id) ON DELETE SET NULL
            );

            CREATE TABLE IF NOT EXISTS credential_definitions (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                version TEXT NOT NULL,
                icon UUID REFERENCES assets(id) ON DELETE SET NULL
            );

            CREATE TABLE IF NOT EXISTS owner_credential_definitions (
                owner_id UUID NOT NULL REFERENCES owners(id) ON DELETE CASCADE,
                credential_definition_id UUID NOT NULL REFERENCES credential_definitions(id) ON DELETE CASCADE,
                seq BIGSERIAL,
                PRIMARY KEY (owner_id, credential_definition_id)
            );
            "#,
        ),
        (
            "20240501000001_flow_aggregate",
            r#"
            CREATE TABLE IF NOT EXISTS flows (
                id UUID PRIMARY KEY,
                kind TEXT NOT NULL CHECK (kind IN ('ISSUANCE', 'PRESENTATION')),
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                owner_id UUID NOT NULL,
                seq BIGSERIAL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_flows_kind ON flows(kind);

            CREATE TABLE IF NOT EXISTS flow_personas (
                flow_id UUID NOT NULL,
                persona_id UUID NOT NULL,
                seq BIGSERIAL,
                CONSTRAINT flow_personas_pkey PRIMARY KEY (flow_id, persona_id),
                CONSTRAINT flow_personas_flow_id_fkey FOREIGN KEY (flow_id) REFERENCES flows(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS steps (
                id UUID PRIMARY KEY,
                flow_id UUID NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                "order" INTEGER NOT NULL,
                step_type TEXT NOT NULL CHECK (step_type IN ('HUMAN_TASK', 'SERVICE', 'WORKFLOW')),
                asset_id UUID,
                CONSTRAINT steps_flow_id_fkey FOREIGN KEY (flow_id) REFERENCES flows(id) ON DELETE CASCADE,
                CONSTRAINT steps_flow_id_order_key UNIQUE (flow_id, "order")
            );

            CREATE TABLE IF NOT EXISTS step_actions (
                id UUID PRIMARY KEY,
                step_id UUID NOT NULL,
                title TEXT NOT NULL,
                action_type TEXT NOT NULL,
                text TEXT NOT NULL,
                seq BIGSERIAL,
                CONSTRAINT step_actions_step_id_fkey FOREIGN KEY (step_id) REFERENCES steps(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_step_actions_step_id ON step_actions(step_id);
            "#,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_ordered_and_unique() {
        let migrations = generate_migrations();
        let names: Vec<&str> = migrations.iter().map(|(name, _)| *name).collect();

        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_flow_schema_declares_step_order_constraint() {
        let (_, sql) = generate_migrations()
            .into_iter()
            .find(|(name, _)| name.ends_with("flow_aggregate"))
            .unwrap();

        assert!(sql.contains("CONSTRAINT steps_flow_id_order_key UNIQUE (flow_id, \"order\")"));
        assert!(sql.contains("REFERENCES steps(id) ON DELETE CASCADE"));
    }
}
