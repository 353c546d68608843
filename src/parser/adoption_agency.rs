use crate::node::NodeId;
use crate::parser::{ActiveElement, Html5Parser, Scope};
use crate::tokenizer::token::Token;

const ADOPTION_AGENCY_OUTER_LOOP_DEPTH: usize = 8;
const ADOPTION_AGENCY_INNER_LOOP_DEPTH: usize = 3;

pub enum AdoptionResult {
    /// No formatting entry matched; the caller handles the tag as "any other end tag"
    ProcessAsAnyOther,
    Completed,
}

impl<'a> Html5Parser<'a> {
    pub(crate) fn run_adoption_agency(&mut self, token: &Token) -> AdoptionResult {
        // Step 1
        let subject = match token {
            Token::EndTag { name, .. } | Token::StartTag { name, .. } => name.clone(),
            _ => return AdoptionResult::Completed,
        };

        // Step 2: fast path when the current node is the subject and carries
        // no active formatting entry
        let current_node_id = current_node!(self).id;
        if current_node!(self).is_html_element(&subject)
            && !self
                .active_formatting_elements
                .contains(&ActiveElement::NodeId(current_node_id))
        {
            self.open_elements.pop();
            return AdoptionResult::Completed;
        }

        // Step 3
        let mut outer_loop_counter = 0;

        // Step 4
        loop {
            // Step 4.1
            if outer_loop_counter >= ADOPTION_AGENCY_OUTER_LOOP_DEPTH {
                return AdoptionResult::Completed;
            }

            // Step 4.2
            outer_loop_counter += 1;

            // Step 4.3: the last matching entry after the last marker
            let mut formatting_entry = None;
            for idx in (0..self.active_formatting_elements.len()).rev() {
                match self.active_formatting_elements[idx] {
                    ActiveElement::Marker => break,
                    ActiveElement::NodeId(node_id) => {
                        let matches = self
                            .document
                            .get_node_by_id(node_id)
                            .is_some_and(|node| node.name == subject);
                        if matches {
                            formatting_entry = Some((idx, node_id));
                            break;
                        }
                    }
                }
            }

            let Some((formatting_element_idx, formatting_element_id)) = formatting_entry else {
                return AdoptionResult::ProcessAsAnyOther;
            };

            // Step 4.4
            let Some(stack_idx) = self
                .open_elements
                .iter()
                .position(|&id| id == formatting_element_id)
            else {
                self.parse_error("formatting element not in open elements");
                self.active_formatting_elements
                    .remove(formatting_element_idx);
                return AdoptionResult::Completed;
            };

            if stack_idx == 0 {
                return AdoptionResult::Completed;
            }

            // Step 4.5
            if !self.is_in_scope(&subject, Scope::Regular) {
                self.parse_error("formatting element not in scope");
                return AdoptionResult::Completed;
            }

            // Step 4.6
            if formatting_element_id != current_node!(self).id {
                self.parse_error("formatting element not the current node");
                // no return; the algorithm continues
            }

            // Step 4.7: the most recently opened special element above the
            // formatting element
            let furthest_block_id = self.open_elements[stack_idx + 1..]
                .iter()
                .copied()
                .find(|&id| {
                    self.document
                        .get_node_by_id(id)
                        .is_some_and(|node| node.is_special())
                });

            // Step 4.8
            let Some(furthest_block_id) = furthest_block_id else {
                while let Some(popped) = self.open_elements.pop() {
                    if popped == formatting_element_id {
                        break;
                    }
                }
                self.active_formatting_elements
                    .remove(formatting_element_idx);
                return AdoptionResult::Completed;
            };

            // Step 4.9
            let common_ancestor_id = self.open_elements[stack_idx - 1];

            // Step 4.10
            let mut bookmark = formatting_element_idx;

            // Step 4.11
            let mut node_stack_idx = self
                .open_elements
                .iter()
                .position(|&id| id == furthest_block_id)
                .expect("furthest block not on the stack");
            let mut last_node_id = furthest_block_id;

            // Step 4.12
            let mut inner_loop_counter = 0;

            // Step 4.13
            loop {
                // Step 4.13.1
                inner_loop_counter += 1;

                // Step 4.13.2: the element immediately above node
                node_stack_idx -= 1;
                let node_id = self.open_elements[node_stack_idx];

                // Step 4.13.3
                if node_id == formatting_element_id {
                    break;
                }

                // Step 4.13.4
                if inner_loop_counter > ADOPTION_AGENCY_INNER_LOOP_DEPTH {
                    if let Some(idx) = self
                        .active_formatting_elements
                        .iter()
                        .position(|entry| entry == &ActiveElement::NodeId(node_id))
                    {
                        self.active_formatting_elements.remove(idx);
                        if idx < bookmark {
                            bookmark -= 1;
                        }
                    }
                }

                // Step 4.13.5
                let Some(list_idx) = self
                    .active_formatting_elements
                    .iter()
                    .position(|entry| entry == &ActiveElement::NodeId(node_id))
                else {
                    self.open_elements.remove(node_stack_idx);
                    continue;
                };

                // Step 4.13.6: replace the node with a fresh clone in both lists
                let replacement_id = match self.document.clone_node(node_id) {
                    Some(id) => id,
                    None => break,
                };
                self.active_formatting_elements[list_idx] = ActiveElement::NodeId(replacement_id);
                self.open_elements[node_stack_idx] = replacement_id;

                // Step 4.13.7
                if last_node_id == furthest_block_id {
                    bookmark = list_idx + 1;
                }

                // Step 4.13.8
                self.document.append(last_node_id, replacement_id);

                // Step 4.13.9
                last_node_id = replacement_id;
            }

            // Step 4.14: move last node under the common ancestor, foster
            // parenting when the ancestor is table glue
            self.document.detach(last_node_id);
            let (parent_id, before_id) = self.adjusted_insert_location(Some(common_ancestor_id));
            match before_id {
                Some(before_id) => self.document.insert_before(last_node_id, parent_id, before_id),
                None => self.document.append(last_node_id, parent_id),
            }

            // Steps 4.15 / 4.16 / 4.17: fresh formatting element adopts the
            // furthest block's children and becomes its last child
            let Some(new_element_id) = self.document.clone_node(formatting_element_id) else {
                return AdoptionResult::Completed;
            };
            let children: Vec<NodeId> = self.document.children(furthest_block_id).to_vec();
            for child_id in children {
                self.document.append(child_id, new_element_id);
            }
            self.document.append(new_element_id, furthest_block_id);

            // Step 4.18
            if let Some(idx) = self
                .active_formatting_elements
                .iter()
                .position(|entry| entry == &ActiveElement::NodeId(formatting_element_id))
            {
                self.active_formatting_elements.remove(idx);
                if idx < bookmark {
                    bookmark -= 1;
                }
            }
            let bookmark = bookmark.min(self.active_formatting_elements.len());
            self.active_formatting_elements
                .insert(bookmark, ActiveElement::NodeId(new_element_id));

            // Step 4.19
            self.open_elements
                .retain(|&id| id != formatting_element_id);
            if let Some(fb_idx) = self
                .open_elements
                .iter()
                .position(|&id| id == furthest_block_id)
            {
                self.open_elements.insert(fb_idx + 1, new_element_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::input_stream::{Encoding, InputStream};
    use crate::node::NodeId;
    use crate::parser::document::Document;
    use crate::parser::Html5Parser;

    fn text_of(document: &Document, node_id: NodeId) -> String {
        use crate::node::NodeData;
        match &document.get_node_by_id(node_id).unwrap().data {
            NodeData::Text { value } => value.clone(),
            _ => String::new(),
        }
    }

    fn name_of(document: &Document, node_id: NodeId) -> String {
        document.get_node_by_id(node_id).unwrap().name.clone()
    }

    #[test]
    fn test_misnested_formatting_tags() {
        let mut stream = InputStream::new();
        stream.read_from_str("<b>1<i>2</b>3</i>", Some(Encoding::UTF8));
        let parser = Html5Parser::new(&mut stream);
        let document = parser.parse().expect("parse");

        let root = document.get_root().id;
        let html = document.children(root)[0];
        let body = document.children(html)[1];
        assert_eq!(name_of(&document, body), "body");

        // b{1, i{2}} followed by a reconstructed i{3}
        let body_children = document.children(body).to_vec();
        assert_eq!(body_children.len(), 2);

        let b = body_children[0];
        assert_eq!(name_of(&document, b), "b");
        let b_children = document.children(b).to_vec();
        assert_eq!(b_children.len(), 2);
        assert_eq!(text_of(&document, b_children[0]), "1");
        assert_eq!(name_of(&document, b_children[1]), "i");
        let inner_i = document.children(b_children[1]).to_vec();
        assert_eq!(text_of(&document, inner_i[0]), "2");

        let i = body_children[1];
        assert_eq!(name_of(&document, i), "i");
        let i_children = document.children(i).to_vec();
        assert_eq!(text_of(&document, i_children[0]), "3");
    }

    #[test]
    fn test_end_tag_without_formatting_entry() {
        let mut stream = InputStream::new();
        stream.read_from_str("<p>one</b>two", Some(Encoding::UTF8));
        let parser = Html5Parser::new(&mut stream);
        let document = parser.parse().expect("parse");

        // the stray </b> is ignored; both text runs stay inside the p
        let root = document.get_root().id;
        let html = document.children(root)[0];
        let body = document.children(html)[1];
        let p = document.children(body)[0];
        assert_eq!(name_of(&document, p), "p");
        let p_children = document.children(p).to_vec();
        assert_eq!(p_children.len(), 1);
        assert_eq!(text_of(&document, p_children[0]), "onetwo");
    }
}
