use catalog_loader::order::{one_to_many, one_to_many_by, one_to_one, one_to_one_by, Row};

#[derive(Debug, Clone, PartialEq)]
struct Item {
    id: u32,
    group_id: u32,
    label: &'static str,
}

impl Row for Item {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }
}

fn item(id: u32, group_id: u32, label: &'static str) -> Item {
    Item {
        id,
        group_id,
        label,
    }
}

#[test]
fn test_one_to_one_follows_key_order() {
    let rows = vec![item(1, 0, "a"), item(2, 0, "b"), item(3, 0, "c")];

    let ordered = one_to_one(&[3, 1, 2], rows.clone());

    assert_eq!(
        ordered,
        vec![Some(rows[2].clone()), Some(rows[0].clone()), Some(rows[1].clone())]
    );
}

#[test]
fn test_one_to_one_missing_key() {
    let rows = vec![item(1, 0, "a")];

    let ordered = one_to_one(&[1, 99, 1], rows.clone());

    assert_eq!(ordered, vec![Some(rows[0].clone()), None, Some(rows[0].clone())]);
}

#[test]
fn test_one_to_one_first_row_wins() {
    let rows = vec![item(1, 0, "first"), item(1, 0, "second")];

    let ordered = one_to_one(&[1], rows);

    assert_eq!(ordered, vec![Some(item(1, 0, "first"))]);
}

#[test]
fn test_one_to_one_by_field() {
    let rows = vec![item(10, 2, "a"), item(11, 1, "b")];

    let ordered = one_to_one_by(&[1, 2, 3], rows, |row| row.group_id);

    assert_eq!(ordered, vec![Some(item(11, 1, "b")), Some(item(10, 2, "a")), None]);
}

#[test]
fn test_one_to_many_groups_in_row_order() {
    let row1 = item(1, 2, "row1");
    let row2 = item(2, 1, "row2");
    let row3 = item(3, 1, "row3");

    let grouped = one_to_many_by(
        &[1, 2],
        vec![row1.clone(), row2.clone(), row3.clone()],
        |row| row.group_id,
    );

    assert_eq!(grouped, vec![vec![row2.clone(), row3.clone()], vec![row1.clone()]]);

    let grouped = one_to_many_by(&[1, 2, 3], vec![row1.clone(), row2.clone(), row3.clone()], |row| {
        row.group_id
    });

    assert_eq!(grouped, vec![vec![row2, row3], vec![row1], vec![]]);
}

#[test]
fn test_one_to_many_by_id() {
    let rows = vec![item(2, 0, "a"), item(1, 0, "b"), item(2, 0, "c")];

    let grouped = one_to_many(&[2, 5, 1], rows);

    assert_eq!(
        grouped,
        vec![vec![item(2, 0, "a"), item(2, 0, "c")], vec![], vec![item(1, 0, "b")]]
    );
}

#[test]
fn test_empty_rows() {
    let rows: Vec<Item> = vec![];

    assert_eq!(one_to_one(&[1, 2], rows.clone()), vec![None, None]);
    assert_eq!(one_to_many(&[1, 2], rows), vec![Vec::<Item>::new(), vec![]]);
}
