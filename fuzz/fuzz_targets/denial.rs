#![no_main]

use domain::base::Ttl;
use libfuzzer_sys::fuzz_target;

use dnssign::dnssec::hash::hash_name;
use dnssign::dnssec::Nsec3Denial;
use dnssign::message::StoredName;

// The input is a wire format apex, a zero octet separator and a wire
// format query name.
fuzz_target!(|data: &[u8]| {
    let Some(split) = data.iter().position(|&b| b == 0) else {
        return;
    };
    let (apex, qname) = data.split_at(split + 1);
    let (Ok(apex), Ok(qname)) = (
        StoredName::from_octets(apex.to_vec()),
        StoredName::from_octets(qname.to_vec()),
    ) else {
        return;
    };
    let Ok(denial) = Nsec3Denial::new(apex.clone(), Ttl::from_secs(30)) else {
        return;
    };
    if !qname.ends_with(&apex) {
        return;
    }

    let hash = hash_name(&qname);
    let records = denial.nxdomain(&qname);
    assert!((2..=3).contains(&records.len()));
    let cover = records[0].data().as_nsec3().unwrap();
    assert_eq!(cover.next_owner().as_slice(), hash.next(2).as_slice());

    let nodata = denial.nodata(&qname);
    let nsec3 = nodata.data().as_nsec3().unwrap();
    assert_eq!(nsec3.next_owner().as_slice(), hash.next(1).as_slice());
});
