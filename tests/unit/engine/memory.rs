use super::*;

#[test]
fn allocations_are_aligned_distinct_and_zeroed() {
    let mut mem = LinearMemory::new();
    let a = mem.allocate(10).unwrap();
    let b = mem.allocate(100).unwrap();
    assert!(!a.is_null());
    assert_eq!(a.addr() % REGION_ALIGN, 0);
    assert_eq!(b.addr() % REGION_ALIGN, 0);
    assert!(b.addr() >= a.addr() + 10);
    assert_eq!(mem.slice(b, 100).unwrap(), vec![0u8; 100].as_slice());
    assert_eq!(mem.live_allocations(), 2);
    assert_eq!(mem.live_bytes(), 110);
}

#[test]
fn interior_pointers_are_bounds_checked() {
    let mut mem = LinearMemory::new();
    let p = mem.allocate(16).unwrap();
    mem.write(p, &[1u8; 16]).unwrap();
    mem.write(p.offset(8), &[2, 3]).unwrap();
    assert_eq!(mem.slice(p.offset(8), 2).unwrap(), &[2, 3]);
    assert!(mem.slice(p.offset(8), 9).unwrap_err().is_contract_violation());
    assert!(mem.slice(p.offset(64), 1).is_err());
    assert!(mem.slice(MemPtr::NULL, 1).is_err());
}

#[test]
fn released_addresses_are_not_reused() {
    let mut mem = LinearMemory::new();
    let a = mem.allocate(8).unwrap();
    mem.release(a).unwrap();
    let b = mem.allocate(8).unwrap();
    assert_ne!(a, b);
    assert!(mem.slice(a, 1).is_err());
    assert!(mem.release(a).unwrap_err().is_contract_violation());
    assert_eq!(mem.live_allocations(), 1);
}

#[test]
fn limit_turns_into_resource_error() {
    let mut mem = LinearMemory::with_limit(100);
    mem.allocate(60).unwrap();
    let err = mem.allocate(60).unwrap_err();
    assert!(matches!(err, EncoderError::Resource(_)));
    assert_eq!(mem.live_bytes(), 60);
}

#[test]
fn zero_sized_allocation_is_rejected() {
    let mut mem = LinearMemory::new();
    assert!(mem.allocate(0).unwrap_err().is_contract_violation());
}

#[test]
fn lent_region_round_trips_and_blocks_access() {
    let mut mem = LinearMemory::new();
    let p = mem.allocate(4).unwrap();

    let mut lent = mem.lend(p).unwrap();
    assert_eq!(lent.ptr(), p);
    assert!(mem.slice(p, 4).unwrap_err().is_contract_violation());
    assert!(mem.release(p).unwrap_err().is_contract_violation());
    assert!(mem.lend(p).is_err());

    lent.as_mut_slice().copy_from_slice(&[4, 3, 2, 1]);
    mem.restore(lent).unwrap();
    assert_eq!(mem.slice(p, 4).unwrap(), &[4, 3, 2, 1]);
    mem.release(p).unwrap();
    assert_eq!(mem.live_bytes(), 0);
}

#[test]
fn restore_rejects_foreign_region() {
    let mut a = LinearMemory::new();
    let mut b = LinearMemory::new();
    let pa = a.allocate(4).unwrap();
    b.allocate(4).unwrap();
    let lent = a.lend(pa).unwrap();
    // `b` has a resident region at the same address, not a loan.
    assert!(b.restore(lent).unwrap_err().is_contract_violation());
}

#[test]
fn restore_only_accepts_an_outstanding_loan() {
    let mut mem = LinearMemory::new();
    let p = mem.allocate(8).unwrap();
    assert!(!mem.is_lent(p));

    let lent = mem.lend(p).unwrap();
    assert!(mem.is_lent(p));
    mem.restore(lent).unwrap();
    assert!(!mem.is_lent(p));

    let again = mem.lend(p).unwrap();
    let mut other = LinearMemory::new();
    let q = other.allocate(16).unwrap();
    assert_eq!(q, p);
    other.lend(q).unwrap();
    assert!(other.restore(again).unwrap_err().is_contract_violation());
}
