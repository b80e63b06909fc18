use matrix_mul::{
    Error, FlatMatrix, RoundRobin, block_rows, extract_column, extract_row, split_into_blocks,
    write_column,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn sample(rows: usize, columns: usize, seed: u64) -> FlatMatrix {
    FlatMatrix::random(rows, columns, 50, &mut StdRng::seed_from_u64(seed)).unwrap()
}

#[test]
fn test_blocks_concatenate_back_to_the_matrix() {
    for (rows, columns, parts) in [(4, 2, 2), (6, 5, 3), (8, 1, 4), (5, 3, 5)] {
        let matrix = sample(rows, columns, rows as u64);
        let blocks = split_into_blocks(&matrix, parts).unwrap();

        assert_eq!(blocks.len(), parts);
        assert!(blocks.iter().all(|block| block.rows() == rows / parts));
        assert!(blocks.iter().all(|block| block.columns() == columns));

        let joined: Vec<i64> = blocks.into_iter().flat_map(FlatMatrix::into_vec).collect();
        assert_eq!(joined, matrix.as_slice());
    }
}

#[test]
fn test_block_k_starts_at_row_k_times_block_rows() {
    let matrix = sample(6, 4, 3);
    let blocks = split_into_blocks(&matrix, 3).unwrap();
    for (k, block) in blocks.iter().enumerate() {
        for r in 0..2 {
            assert_eq!(block.row(r).unwrap(), matrix.row(k * 2 + r).unwrap());
        }
    }
}

#[test]
fn test_uneven_split_is_a_configuration_error() {
    let matrix = sample(3, 2, 0);
    assert!(matches!(
        split_into_blocks(&matrix, 2),
        Err(Error::Configuration(_))
    ));
    assert!(matches!(block_rows(4, 0), Err(Error::Configuration(_))));
    assert_eq!(block_rows(12, 4).unwrap(), 3);
}

#[test]
fn test_columns_written_back_rebuild_the_matrix() {
    let matrix = sample(5, 3, 7);
    let mut rebuilt = FlatMatrix::zeros(5, 3).unwrap();
    for column in 0..3 {
        let values = extract_column(&matrix, column).unwrap();
        assert_eq!(values.len(), 5);
        write_column(&mut rebuilt, column, 0, &values).unwrap();
    }
    assert_eq!(rebuilt, matrix);
}

#[test]
fn test_column_segment_lands_at_row_offset() {
    let mut matrix = FlatMatrix::zeros(4, 2).unwrap();
    write_column(&mut matrix, 1, 2, &[7, 9]).unwrap();
    assert_eq!(matrix.as_slice(), &[0, 0, 0, 0, 0, 7, 0, 9]);

    assert!(matches!(
        write_column(&mut matrix, 1, 3, &[1, 2]),
        Err(Error::OutOfBounds { row: 4, .. })
    ));
}

#[test]
fn test_extract_row_and_column() {
    let matrix = FlatMatrix::from_vec(vec![1, 2, 3, 4, 5, 6], 2, 3).unwrap();
    assert_eq!(extract_row(&matrix, 1).unwrap(), vec![4, 5, 6]);
    assert_eq!(extract_column(&matrix, 2).unwrap(), vec![3, 6]);
    assert!(extract_row(&matrix, 2).is_err());
    assert!(extract_column(&matrix, 3).is_err());
}

#[test]
fn test_round_robin_assignment_is_fair() {
    for (size, coordinator, items) in [(2, 0, 7), (4, 0, 16), (5, 2, 13), (3, 1, 2)] {
        let mut counts = vec![0usize; size];
        for rank in RoundRobin::new(size, coordinator).unwrap().take(items) {
            counts[rank] += 1;
        }

        let workers = size - 1;
        assert_eq!(counts[coordinator], 0);
        assert_eq!(counts.iter().sum::<usize>(), items);
        for (rank, &count) in counts.iter().enumerate() {
            if rank != coordinator {
                assert!(count == items / workers || count == items.div_ceil(workers));
            }
        }
    }
}

#[test]
fn test_reference_product_rejects_incompatible_shapes() {
    let a = FlatMatrix::zeros(2, 3).unwrap();
    let b = FlatMatrix::zeros(2, 3).unwrap();
    assert!(matches!(
        a.multiply(&b),
        Err(Error::DimensionMismatch(2, 3, 2, 3))
    ));
}
