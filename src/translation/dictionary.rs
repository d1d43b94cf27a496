// SPDX-License-Identifier: AGPL-3.0-or-later

//! Curated Thai form vocabulary.
//!
//! Exact matches here resolve without touching the cache or the external
//! service. The list covers the phrases form authors use most.
use std::collections::HashMap;

use once_cell::sync::Lazy;

static DICTIONARY: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();

    // Identity
    map.insert("ชื่อ", "name");
    map.insert("ชื่อเต็ม", "full name");
    map.insert("ชื่อจริง", "first name");
    map.insert("นามสกุล", "last name");
    map.insert("ชื่อเล่น", "nickname");
    map.insert("คำนำหน้า", "title prefix");
    map.insert("เพศ", "gender");
    map.insert("อายุ", "age");
    map.insert("วันเกิด", "date of birth");
    map.insert("สัญชาติ", "nationality");
    map.insert("เลขบัตรประชาชน", "national id");

    // Contact
    map.insert("อีเมล", "email");
    map.insert("โทรศัพท์", "telephone");
    map.insert("เบอร์โทร", "phone number");
    map.insert("เบอร์โทรศัพท์", "phone number");
    map.insert("มือถือ", "mobile");
    map.insert("ที่อยู่", "address");
    map.insert("จังหวัด", "province");
    map.insert("อำเภอ", "district");
    map.insert("ตำบล", "subdistrict");
    map.insert("รหัสไปรษณีย์", "postal code");
    map.insert("ประเทศ", "country");

    // Work
    map.insert("บริษัท", "company");
    map.insert("แผนก", "department");
    map.insert("ตำแหน่ง", "position");
    map.insert("โรงงาน", "factory");
    map.insert("สาขา", "branch");
    map.insert("พนักงาน", "employee");
    map.insert("รหัสพนักงาน", "employee id");

    // Forms
    map.insert("แบบฟอร์ม", "form");
    map.insert("ข้อมูล", "data");
    map.insert("บันทึก", "record");
    map.insert("บันทึกข้อมูล", "data record");
    map.insert("แบบฟอร์มบันทึกข้อมูล", "data recording form");
    map.insert("รายละเอียด", "details");
    map.insert("คำอธิบาย", "description");
    map.insert("หมายเหตุ", "note");
    map.insert("หัวข้อ", "subject");
    map.insert("ประเภท", "category");
    map.insert("สถานะ", "status");
    map.insert("ลำดับ", "sequence");

    // Dates and amounts
    map.insert("วันที่", "date");
    map.insert("เวลา", "time");
    map.insert("วันที่เริ่มต้น", "start date");
    map.insert("วันที่สิ้นสุด", "end date");
    map.insert("จำนวน", "quantity");
    map.insert("จำนวนเงิน", "amount");
    map.insert("ราคา", "price");
    map.insert("คะแนน", "score");

    map
});

/// Looks up a phrase in the static dictionary, keyed by the trimmed source
/// text.
pub fn lookup(phrase: &str) -> Option<&'static str> {
    DICTIONARY.get(phrase.trim()).copied()
}

#[cfg(test)]
mod tests {
    use super::lookup;

    #[test]
    fn known_phrases_resolve() {
        assert_eq!(lookup("ชื่อเต็ม"), Some("full name"));
        assert_eq!(lookup("  ชื่อเต็ม  "), Some("full name"));
        assert_eq!(lookup("เบอร์โทรศัพท์"), Some("phone number"));
    }

    #[test]
    fn unknown_phrases_miss() {
        assert_eq!(lookup("ไม่มีในพจนานุกรม"), None);
        assert_eq!(lookup("unknown"), None);
    }
}
