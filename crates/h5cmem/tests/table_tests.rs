//! Packet table tests.

use h5cmem::{Datatype, Error, File, FileFlags, H5Type, Location, Table};
use h5cmem_types::{DecodingError, EncodingError};

#[derive(H5Type, Debug, Clone, PartialEq, Default)]
#[repr(C)]
struct Particle {
    id: u64,
    position: [f32; 3],
    charge: i8,
    history: Vec<u16>,
    label: String,
}

fn particle(i: u64) -> Particle {
    Particle {
        id: i,
        position: [i as f32, -(i as f32), 0.5],
        charge: if i % 2 == 0 { 1 } else { -1 },
        history: (0..i as u16).collect(),
        label: format!("p{i}"),
    }
}

fn table(name: &str) -> (tempfile::TempDir, File, Table) {
    let dir = tempfile::tempdir().unwrap();
    let file = File::create(dir.path().join(name), FileFlags::Truncate).unwrap();
    let table = file.create_table_for::<Particle>("particles", 4, None).unwrap();
    (dir, file, table)
}

#[test]
fn append_then_read_in_batches() {
    let (_dir, _file, t) = table("pt-batches.h5");
    assert!(t.is_valid());
    assert_eq!(t.num_packets().unwrap(), 0);

    t.append_one(&particle(0)).unwrap();
    let rest: Vec<Particle> = (1..7).map(particle).collect();
    t.append(&rest).unwrap();
    assert_eq!(t.num_packets().unwrap(), 7);

    let mut buf = vec![Particle::default(); 3];
    t.read_packets(2, 3, &mut buf).unwrap();
    assert_eq!(buf, (2..5).map(particle).collect::<Vec<_>>());

    let mut small = vec![Particle::default(); 2];
    let err = t.read_packets(0, 3, &mut small).unwrap_err();
    assert!(matches!(
        err,
        Error::Layout(h5cmem_types::Error::Decoding(DecodingError::InsufficientCapacity {
            needed: 3,
            available: 2
        }))
    ));
    assert!(t.read_packets(6, 2, &mut small).is_err());
}

#[test]
fn cursor_walks_the_table() {
    let (_dir, _file, t) = table("pt-cursor.h5");
    let all: Vec<Particle> = (0..5).map(particle).collect();
    t.append(&all).unwrap();

    let mut two = vec![Particle::default(); 2];
    t.next(&mut two).unwrap();
    assert_eq!(two, all[0..2]);
    t.next(&mut two).unwrap();
    assert_eq!(two, all[2..4]);
    assert!(t.next(&mut two).is_err());

    t.create_index().unwrap();
    let mut one = vec![Particle::default(); 1];
    t.next(&mut one).unwrap();
    assert_eq!(one[0], all[0]);

    t.set_index(4).unwrap();
    t.next(&mut one).unwrap();
    assert_eq!(one[0], all[4]);
    assert!(t.set_index(6).is_err());
}

#[test]
fn empty_append_is_rejected() {
    let (_dir, _file, t) = table("pt-empty.h5");
    let err = t.append::<Particle>(&[]).unwrap_err();
    assert!(matches!(
        err,
        Error::Layout(h5cmem_types::Error::Encoding(EncodingError::EmptySequence(_)))
    ));
    assert_eq!(t.num_packets().unwrap(), 0);
}

#[test]
fn reopened_table_keeps_packets() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pt-reopen.h5");
    {
        let f = File::create(&path, FileFlags::Truncate).unwrap();
        let g = f.create_group("run1").unwrap();
        let dt = Datatype::of::<u32>().unwrap();
        let mut t = g.create_table("hits", &dt, 16, Some(5)).unwrap();
        t.append(&[10u32, 20, 30]).unwrap();
        t.close().unwrap();
        t.close().unwrap();
        assert!(!t.is_valid());
    }
    let f = File::open(&path, FileFlags::ReadOnly).unwrap();
    let t = f.open_group("run1").unwrap().open_table("hits").unwrap();
    assert_eq!(t.num_packets().unwrap(), 3);
    assert!(t.datatype().unwrap().equal(&Datatype::of::<u32>().unwrap()).unwrap());
    let mut out = [0u32; 3];
    t.next(&mut out).unwrap();
    assert_eq!(out, [10, 20, 30]);
    assert!(t.append(&[40u32]).is_err());

    let mut wrong = [0i64; 1];
    assert!(t.read_packets(0, 1, &mut wrong).is_err());
}

#[test]
fn zero_chunk_size_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let f = File::create(dir.path().join("pt-zero.h5"), FileFlags::Truncate).unwrap();
    assert!(f.create_table_for::<u8>("t", 0, None).is_err());
    assert!(!f.link_exists("t").unwrap());
}
