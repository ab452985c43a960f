//! POS merchant/device registry used by paymaster scope checks (§4.7 step 2).

use nhb_trie::TrieDb;
use serde::{Deserialize, Serialize};
use shared_types::Address;

use crate::keys;
use crate::state::State;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantRecord {
    pub merchant_id: String,
    pub owner: Address,
    pub paused: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub device_id: String,
    pub merchant_id: String,
    pub revoked: bool,
}

impl<D: TrieDb + Clone> State<D> {
    pub fn get_merchant(&self, merchant_id: &str) -> Option<MerchantRecord> {
        self.get(&keys::merchant_key(merchant_id))
    }

    pub fn put_merchant(&mut self, record: MerchantRecord) {
        self.put(keys::merchant_key(&record.merchant_id), &record);
    }

    pub fn set_merchant_paused(&mut self, merchant_id: &str, paused: bool) {
        if let Some(mut record) = self.get_merchant(merchant_id) {
            record.paused = paused;
            self.put_merchant(record);
        }
    }

    pub fn get_device(&self, device_id: &str) -> Option<DeviceRecord> {
        self.get(&keys::device_key(device_id))
    }

    pub fn put_device(&mut self, record: DeviceRecord) {
        self.put(keys::device_key(&record.device_id), &record);
    }

    pub fn set_device_revoked(&mut self, device_id: &str, revoked: bool) {
        if let Some(mut record) = self.get_device(device_id) {
            record.revoked = revoked;
            self.put_device(record);
        }
    }
}
