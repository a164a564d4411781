use super::MovableObject;
use crate::moid::{Moid, MoidIndex};

impl MovableObject {
    /// Register this object and its attachments in this frame's MOID index.
    ///
    /// With `make_new` the object takes the next free slot; otherwise it shares
    /// the slot assigned last. `root` is the sentinel for top-level objects,
    /// which become their own root. Attachments are registered in order,
    /// under the same root, each with its own `new_moid` flag.
    pub fn update_moid(&mut self, index: &mut MoidIndex, root: Moid, make_new: bool) {
        self.moid = if make_new {
            index.push(self.unique_id)
        } else {
            index.last()
        };
        self.root_moid = if root.is_none() { self.moid } else { root };

        let root = self.root_moid;
        for attachment in &mut self.attachments {
            attachment
                .object
                .update_moid(index, root, attachment.new_moid);
        }

        self.footprint = index.len() - self.moid.index();
    }

    /// MOIDs held by this object and its attachments, each once, sentinel excluded.
    pub fn get_moids(&self) -> Vec<Moid> {
        let mut moids = Vec::new();
        self.collect_moids(&mut moids);
        moids
    }

    fn collect_moids(&self, moids: &mut Vec<Moid>) {
        if !self.moid.is_none() && !moids.contains(&self.moid) {
            moids.push(self.moid);
        }
        for attachment in &self.attachments {
            attachment.object.collect_moids(moids);
        }
    }

    pub fn moid(&self) -> Moid {
        self.moid
    }

    pub fn root_moid(&self) -> Moid {
        self.root_moid
    }

    /// Number of MOIDs taken by this object and its attachments this frame.
    pub fn footprint(&self) -> usize {
        self.footprint
    }
}
