#![no_main]
use libfuzzer_sys::fuzz_target;

use exidict::bit_width;
use exidict::{
    ChannelKeeper, CompactIdResult, DictOptions, SessionMode, StringLiteralResult, StringTable,
    ValueResult,
};

fuzz_target!(|data: &[u8]| {
    // Drive an encode-mode and a decode-mode table with the same operation
    // sequence (misses replicated to the decode side, as the wire would) and
    // assert both derive identical partitions.
    let mut input = data.iter().copied();
    let Some(cfg) = input.next() else { return };
    let capacity = match cfg & 0x0f {
        0x0f => -1,
        n => i32::from(n),
    };
    let options = DictOptions::default()
        .with_value_partition_capacity(capacity)
        .with_block_size(32);
    if options.validate().is_err() {
        return;
    }

    let mut enc = StringTable::new(SessionMode::Encode, &options);
    let mut dec = StringTable::new(SessionMode::Decode, &options);
    let mut keeper: ChannelKeeper<Vec<u8>> = ChannelKeeper::new(options.block_size());

    while let Some(op) = input.next() {
        let arg = input.next().unwrap_or(0);
        match op % 6 {
            0 => {
                let uri = format!("urn:u{}", arg % 13);
                if let (CompactIdResult::Miss(_), _) = enc.encode_uri(&uri) {
                    dec.add_uri(&uri);
                }
            }
            1 => {
                let uri_id = usize::from(arg) % enc.uri_count();
                let name = format!("n{}", arg % 17);
                if let (StringLiteralResult::Miss, _) = enc.encode_local_name(uri_id, &name) {
                    dec.add_local_name(uri_id, &name);
                }
            }
            2 => {
                let uri_id = usize::from(arg) % enc.uri_count();
                let prefix = format!("p{}", arg % 7);
                if let (CompactIdResult::Miss(_), _) = enc.encode_prefix(uri_id, &prefix) {
                    dec.add_prefix(uri_id, &prefix);
                }
            }
            3 => {
                let uri_id = usize::from(arg) % enc.uri_count();
                if enc.local_name_count(uri_id) == 0 {
                    continue;
                }
                let name_id = usize::from(arg / 16) % enc.local_name_count(uri_id);
                let value = format!("w{}", arg % 23);
                if let (ValueResult::Miss, _, _) = enc.encode_value(uri_id, name_id, &value) {
                    dec.add_value(uri_id, name_id, &value);
                }
            }
            4 => {
                let uri_id = usize::from(arg) % enc.uri_count();
                if enc.local_name_count(uri_id) == 0 {
                    continue;
                }
                let name_id = usize::from(arg / 16) % enc.local_name_count(uri_id);
                let id =
                    keeper.get_or_create(enc.channel_slot_mut(uri_id, name_id), uri_id, name_id);
                keeper.channel_mut(id).store_mut().push(arg);
                if keeper.route_value(id) {
                    keeper.finish();
                    keeper.punctuate();
                }
            }
            _ => {
                enc.reset();
                dec.reset();
                keeper.reset();
            }
        }
    }
    keeper.finish();

    assert_eq!(enc.uri_count(), dec.uri_count());
    assert_eq!(enc.uri_forwarded_width(), dec.uri_forwarded_width());
    assert_eq!(enc.global_value_count(), dec.global_value_count());
    assert_eq!(enc.global_value_width(), dec.global_value_width());
    for uri_id in 0..enc.uri_count() {
        assert_eq!(enc.get_uri(uri_id), dec.get_uri(uri_id));
        assert_eq!(enc.prefix_count(uri_id), dec.prefix_count(uri_id));
        assert_eq!(enc.local_name_count(uri_id), dec.local_name_count(uri_id));
        for name_id in 0..enc.local_name_count(uri_id) {
            assert_eq!(
                enc.get_local_name(uri_id, name_id),
                dec.get_local_name(uri_id, name_id)
            );
            assert_eq!(
                enc.local_value_count(uri_id, name_id),
                dec.local_value_count(uri_id, name_id)
            );
            // Encode-mode lookups must agree with a positional scan.
            for local_id in 0..enc.local_value_count(uri_id, name_id) {
                if let Some(value) = enc.get_local_value(uri_id, name_id, local_id) {
                    assert_eq!(
                        enc.lookup_value(uri_id, name_id, value),
                        ValueResult::HitLocal(local_id)
                    );
                    assert_eq!(dec.get_local_value(uri_id, name_id, local_id), Some(value));
                }
            }
        }
    }
    match capacity {
        -1 => assert_eq!(
            enc.global_value_width(),
            bit_width::for_count(enc.global_value_count())
        ),
        cap => assert!(enc.global_value_count() <= cap as usize),
    }

    let mut prev = 0;
    for &id in keeper.large_channels() {
        let first = keeper.channel(id).first_position();
        assert!(first >= prev, "large channels sorted by first position");
        prev = first;
    }
});
