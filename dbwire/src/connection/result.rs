//! `QueryResult` and friends (spec §3): what a completed command hands back
//! to the caller.

use crate::error::{Error, Result};
use crate::protocol::packet::ColumnInformation;
use bytes::Bytes;
use std::rc::Rc;

#[derive(Debug)]
pub enum QueryResult {
    Update { affected_rows: u64, warnings: u16, message: String, insert_id: u64 },
    ResultSet(ResultSet),
}

impl QueryResult {
    pub fn into_result_set(self) -> Option<ResultSet> {
        match self {
            QueryResult::ResultSet(rs) => Some(rs),
            QueryResult::Update { .. } => None,
        }
    }
}

#[derive(Debug)]
pub struct ResultSet {
    pub columns: Rc<Vec<ColumnInformation>>,
    pub rows: Vec<Row>,
    pub warnings: u16,
}

/// One row: raw server-side textual values plus a shared reference to the
/// originating column metadata (spec §3).
#[derive(Debug)]
pub struct Row {
    pub columns: Rc<Vec<ColumnInformation>>,
    pub values: Vec<Option<Bytes>>,
}

impl Row {
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.values.get(index).and_then(|v| v.as_deref())
    }

    pub fn get_by_name(&self, name: &str) -> Result<Option<&[u8]>> {
        let index = self
            .columns
            .iter()
            .position(|column| column.name.as_ref() == name.as_bytes())
            .ok_or_else(|| Error::column_lookup(name))?;
        Ok(self.get(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::packet::ColumnInformation;

    fn column(name: &str) -> ColumnInformation {
        ColumnInformation {
            schema: Bytes::new(),
            table: Bytes::new(),
            name: Bytes::copy_from_slice(name.as_bytes()),
            column_type: 0,
            length: 0,
            flags: 0,
            decimals: 0,
        }
    }

    #[test]
    fn it_looks_up_a_value_by_column_name() {
        let columns = Rc::new(vec![column("id"), column("name")]);
        let row = Row { columns: columns.clone(), values: vec![Some(Bytes::from("1")), None] };

        assert_eq!(row.get_by_name("id").unwrap(), Some(&b"1"[..]));
        assert_eq!(row.get_by_name("name").unwrap(), None);
        assert!(row.get_by_name("missing").is_err());
    }
}
