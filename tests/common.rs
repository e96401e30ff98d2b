//! Common test utilities shared between integration tests

/// Append an unsigned LEB128 value.
pub fn leb(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            return;
        }
    }
}

/// Build a module: the 8-byte header plus the given `(id, payload)` sections.
pub fn module(sections: &[(u8, Vec<u8>)]) -> Vec<u8> {
    let mut bytes = vec![0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];
    for (id, payload) in sections {
        bytes.push(*id);
        leb(&mut bytes, payload.len() as u64);
        bytes.extend_from_slice(payload);
    }
    bytes
}

/// A type section with the given `(params, results)` signatures, each value
/// a raw value type byte.
pub fn type_section(signatures: &[(&[u8], &[u8])]) -> Vec<u8> {
    let mut payload = Vec::new();
    leb(&mut payload, signatures.len() as u64);
    for (params, results) in signatures {
        payload.push(0x60);
        leb(&mut payload, params.len() as u64);
        payload.extend_from_slice(params);
        leb(&mut payload, results.len() as u64);
        payload.extend_from_slice(results);
    }
    payload
}

/// A function section declaring one function per type index.
pub fn function_section(type_indices: &[u32]) -> Vec<u8> {
    let mut payload = Vec::new();
    leb(&mut payload, type_indices.len() as u64);
    for &index in type_indices {
        leb(&mut payload, u64::from(index));
    }
    payload
}

/// A code section from raw bodies (`locals` groups already encoded).
pub fn code_section(bodies: &[Vec<u8>]) -> Vec<u8> {
    let mut payload = Vec::new();
    leb(&mut payload, bodies.len() as u64);
    for body in bodies {
        leb(&mut payload, body.len() as u64);
        payload.extend_from_slice(body);
    }
    payload
}

/// A body with no locals and the given expression bytes.
pub fn body(expr: &[u8]) -> Vec<u8> {
    let mut out = vec![0x00];
    out.extend_from_slice(expr);
    out
}
