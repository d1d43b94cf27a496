// SPDX-License-Identifier: AGPL-3.0-or-later

/// Foreign key reference carried by a column.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Reference {
    /// Referenced table.
    pub table: String,

    /// Referenced column.
    pub column: String,

    /// Whether rows cascade away with the referenced row.
    pub cascade_delete: bool,
}

/// One column of a table design.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ColumnSpec {
    /// Resolved column identifier.
    pub name: String,

    /// Relational type, portable across the supported engines.
    pub sql_type: String,

    /// Whether the column is declared `NOT NULL`.
    pub not_null: bool,

    /// Whether the column is the primary key.
    pub primary_key: bool,

    /// Optional foreign key reference.
    pub references: Option<Reference>,
}

impl ColumnSpec {
    /// Returns a plain nullable column.
    pub fn new(name: &str, sql_type: &str) -> Self {
        Self {
            name: name.to_owned(),
            sql_type: sql_type.to_owned(),
            not_null: false,
            primary_key: false,
            references: None,
        }
    }

    /// Marks the column `NOT NULL`.
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Marks the column as the primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self
    }

    /// Adds a cascading foreign key to `table (column)`.
    pub fn references(mut self, table: &str, column: &str) -> Self {
        self.references = Some(Reference {
            table: table.to_owned(),
            column: column.to_owned(),
            cascade_delete: true,
        });
        self
    }

    /// Renders the column for a `CREATE TABLE` statement.
    fn render(&self) -> String {
        let mut rendered = format!("{} {}", self.name, self.sql_type);

        if self.primary_key {
            rendered.push_str(" PRIMARY KEY");
        } else if self.not_null {
            rendered.push_str(" NOT NULL");
        }

        if let Some(reference) = &self.references {
            rendered.push_str(&format!(" REFERENCES {} ({})", reference.table, reference.column));
            if reference.cascade_delete {
                rendered.push_str(" ON DELETE CASCADE");
            }
        }

        rendered
    }
}

/// One secondary index of a table design.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct IndexSpec {
    /// Index identifier.
    pub name: String,

    /// Indexed column.
    pub column: String,
}

/// Complete design of one materialized table.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TableDesign {
    /// Resolved table identifier.
    pub table_name: String,

    /// All columns in materialization order.
    pub columns: Vec<ColumnSpec>,

    /// Secondary indexes.
    pub indexes: Vec<IndexSpec>,
}

impl TableDesign {
    /// Renders the `CREATE TABLE IF NOT EXISTS` statement for this design.
    pub fn create_table_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(|column| column.render()).collect();

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.table_name,
            columns.join(",\n    ")
        )
    }

    /// Renders one `CREATE INDEX IF NOT EXISTS` statement per index spec.
    pub fn create_index_sql(&self) -> Vec<String> {
        self.indexes
            .iter()
            .map(|index| {
                format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                    index.name, self.table_name, index.column
                )
            })
            .collect()
    }

    /// Returns the column spec with the given name, if present.
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|column| column.name == name)
    }
}
